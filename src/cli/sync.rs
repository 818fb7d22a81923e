//! Sync command implementation

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use super::utils::print_failures;
use crate::domain::Config;
use crate::scan::TreeKind;
use crate::sync::{apply_sync_plan, plan_sync};

#[derive(Args)]
pub struct SyncArgs {
    /// Tree to copy from
    #[arg(long, value_name = "DIR")]
    pub source: PathBuf,

    /// Tree to copy into (defaults to the content root)
    #[arg(long, value_name = "DIR")]
    pub target: Option<PathBuf>,

    /// Apply builder-tree exclusions (local env files, generated exports)
    #[arg(long)]
    pub builder: bool,

    /// Show what would be copied without copying
    #[arg(long)]
    pub dry_run: bool,
}

pub fn run(args: SyncArgs, config: &Config) -> Result<()> {
    let source = config.resolve(&args.source);
    let target = args.target.map(|p| config.resolve(&p)).unwrap_or_else(|| config.content_dir());
    if !source.is_dir() {
        anyhow::bail!("Source is not a directory: {}", source.display());
    }
    let kind = if args.builder { TreeKind::Builder } else { TreeKind::Content };

    let plan = plan_sync(&source, &target, config, kind)?;

    if args.dry_run {
        println!("Dry run: {} file(s) would be copied", plan.copy_count());
        for rel in &plan.added {
            println!("  + {}", rel);
        }
        for rel in &plan.modified {
            println!("  ~ {}", rel);
        }
        return Ok(());
    }

    let outcome = apply_sync_plan(&source, &target, &plan);
    println!("Sync complete!");
    println!("  Added:           {}", plan.added.len());
    println!("  Modified:        {}", plan.modified.len());
    println!("  Unchanged:       {}", plan.unchanged.len());
    println!("  Copied:          {}", outcome.copied.len());
    if !outcome.failed.is_empty() {
        print_failures(&outcome.failed);
        anyhow::bail!("{} file(s) could not be copied", outcome.failed.len());
    }
    Ok(())
}
