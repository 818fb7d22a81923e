//! Normalize command implementation

use anyhow::Result;
use chrono::Utc;
use clap::Args;

use super::utils::print_run_summary;
use crate::domain::Config;
use crate::pipeline::run_normalize;

#[derive(Args)]
pub struct NormalizeArgs {
    /// Exit with an error status if any file could not be normalized
    #[arg(long)]
    pub strict: bool,
}

pub fn run(args: NormalizeArgs, config: &Config) -> Result<()> {
    let summary = run_normalize(config, Utc::now())?;

    println!("Normalize complete!");
    println!("  Files processed: {}", summary.processed);
    println!("  Updated:         {}", summary.updated);
    println!("  Unchanged:       {}", summary.unchanged);
    print_run_summary(&summary);

    if args.strict && summary.failure_count() > 0 {
        anyhow::bail!("{} file(s) could not be normalized", summary.failure_count());
    }
    Ok(())
}
