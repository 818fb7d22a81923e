//! Command-line interface for content-registry
//!
//! One subcommand per pipeline phase plus registry maintenance (`migrate`,
//! `query`) and the content mirror (`sync`).

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{load_config, merge_cli_with_config, CliOverrides};
use crate::domain::Config;

mod compile;
mod normalize;
mod query;
mod scan;
mod sync;
mod utils;

/// Fingerprint, normalize and index a tree of metadata-bearing content files
#[derive(Parser)]
#[command(name = "content-registry")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (sets log level to DEBUG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    global: GlobalArgs,
}

#[derive(Args)]
struct GlobalArgs {
    /// Project directory all relative paths are resolved against
    #[arg(short = 'C', long, value_name = "DIR", default_value = ".", global = true)]
    base_dir: PathBuf,

    /// Config file (TOML or YAML); auto-discovered in the base directory if omitted
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Content root holding the category folders
    #[arg(long, value_name = "DIR", global = true)]
    content_root: Option<PathBuf>,

    /// Category folders to scan (comma-separated)
    #[arg(long, value_name = "NAMES", global = true)]
    categories: Option<String>,

    /// JSON registry path
    #[arg(long, value_name = "FILE", global = true)]
    registry_json: Option<PathBuf>,

    /// SQLite registry path
    #[arg(long, value_name = "FILE", global = true)]
    registry_db: Option<PathBuf>,

    /// Worklist path
    #[arg(long, value_name = "FILE", global = true)]
    worklist: Option<PathBuf>,

    /// Author written into filled headers
    #[arg(long, value_name = "NAME", global = true)]
    author: Option<String>,

    /// Process files on a single thread
    #[arg(long, global = true)]
    no_parallel: bool,
}

impl GlobalArgs {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            content_root: self.content_root.clone(),
            categories: utils::parse_csv(&self.categories),
            registry_json: self.registry_json.clone(),
            registry_db: self.registry_db.clone(),
            worklist_path: self.worklist.clone(),
            default_author: self.author.clone(),
            no_parallel: self.no_parallel,
        }
    }

    fn load(&self) -> Result<Config> {
        let config = load_config(&self.base_dir, self.config.as_deref())?;
        Ok(merge_cli_with_config(config, &self.overrides()))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fingerprint the content tree and write the worklist of changed files
    Scan(scan::ScanArgs),

    /// Fill missing header fields in worklist files (or the whole tree)
    Normalize(normalize::NormalizeArgs),

    /// Rebuild the registry from the content tree
    Compile(compile::CompileArgs),

    /// Copy an existing JSON registry into the SQLite registry
    Migrate(compile::MigrateArgs),

    /// Query the SQLite registry
    Query(query::QueryArgs),

    /// Mirror a source content tree into a target tree
    Sync(sync::SyncArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG in the environment always takes precedence; --verbose falls back to DEBUG.
    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    let config = cli.global.load()?;
    tracing::debug!("Using base directory {}", config.base_dir.display());

    match cli.command {
        Commands::Scan(args) => scan::run(args, config),
        Commands::Normalize(args) => normalize::run(args, &config),
        Commands::Compile(args) => compile::run(args, config),
        Commands::Migrate(args) => compile::run_migrate(args, &config),
        Commands::Query(args) => query::run(args, &config),
        Commands::Sync(args) => sync::run(args, &config),
    }
}
