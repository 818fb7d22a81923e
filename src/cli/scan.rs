//! Scan command implementation

use anyhow::Result;
use clap::Args;

use crate::domain::{Config, RegistryFormat};
use crate::pipeline::run_scan;

#[derive(Args)]
pub struct ScanArgs {
    /// Registry to compare against: json or sqlite
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<RegistryFormat>,

    /// Print every worklist entry
    #[arg(long)]
    pub list: bool,
}

pub fn run(args: ScanArgs, mut config: Config) -> Result<()> {
    if let Some(format) = args.format {
        config.format = format;
    }

    let report = run_scan(&config)?;
    let unavailable = report.fingerprints.values().filter(|f| !f.is_available()).count();

    println!("Scan complete!");
    println!("  Files scanned:   {}", report.stats.files_scanned);
    println!("  Files included:  {}", report.stats.files_included);
    if report.stats.files_skipped() > 0 {
        println!("  Files skipped:   {}", report.stats.files_skipped());
    }
    if unavailable > 0 {
        println!("  Unreadable:      {}", unavailable);
    }
    match report.prior_entries {
        Some(count) => println!("  Prior registry:  {} item(s)", count),
        None => println!("  Prior registry:  none (all files listed)"),
    }
    println!("  Changed files:   {}", report.worklist.len());
    println!("  Worklist:        {}", report.worklist_path.display());

    if args.list {
        for path in &report.worklist {
            println!("    {}", path);
        }
    }
    Ok(())
}
