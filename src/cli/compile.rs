//! Compile and migrate command implementations

use anyhow::Result;
use chrono::Utc;
use clap::Args;
use std::path::PathBuf;

use super::utils::print_run_summary;
use crate::domain::{Config, RegistryFormat};
use crate::pipeline::run_compile;
use crate::registry::sqlite::migrate_json_to_sqlite;

#[derive(Args)]
pub struct CompileArgs {
    /// Registry encoding to write: json or sqlite
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<RegistryFormat>,

    /// Exit with an error status if any file was left out of the registry
    #[arg(long)]
    pub strict: bool,
}

pub fn run(args: CompileArgs, config: Config) -> Result<()> {
    let format = args.format.unwrap_or(config.format);
    let report = run_compile(&config, format, Utc::now())?;

    println!("Compile complete!");
    println!("  Items:           {}", report.registry.len());
    println!("  Files scanned:   {}", report.stats.files_scanned);
    println!("  Files included:  {}", report.stats.files_included);
    println!("  Registry:        {}", report.output.display());
    print_run_summary(&report.summary);

    if args.strict && report.summary.failure_count() > 0 {
        anyhow::bail!("{} file(s) were left out of the registry", report.summary.failure_count());
    }
    Ok(())
}

#[derive(Args)]
pub struct MigrateArgs {
    /// JSON registry to read (defaults to the configured registry path)
    #[arg(long, value_name = "FILE")]
    pub from: Option<PathBuf>,

    /// SQLite database to write (defaults to the configured database path)
    #[arg(long, value_name = "FILE")]
    pub to: Option<PathBuf>,
}

pub fn run_migrate(args: MigrateArgs, config: &Config) -> Result<()> {
    let json_path = args.from.map(|p| config.resolve(&p)).unwrap_or_else(|| config.registry_json_path());
    let db_path = args.to.map(|p| config.resolve(&p)).unwrap_or_else(|| config.registry_db_path());

    let rows = migrate_json_to_sqlite(&json_path, &db_path, &config.default_author, Utc::now())?;

    println!("Migration complete!");
    println!("  Source:          {}", json_path.display());
    println!("  Database:        {}", db_path.display());
    println!("  Rows written:    {}", rows);
    Ok(())
}
