//! Query command implementation

use anyhow::Result;
use chrono::Utc;
use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::domain::{Category, Config};
use crate::registry::query::{
    by_agent_mode, counts_by_type, high_scoring, open_read_only, recent_cutoff, recently_updated, search,
    ItemSummary,
};

#[derive(Args)]
pub struct QueryArgs {
    /// SQLite registry to query (defaults to the configured database path)
    #[arg(long, value_name = "FILE")]
    pub db: Option<PathBuf>,

    /// Max results to display
    #[arg(short = 'n', long, value_name = "COUNT", default_value_t = 20, global = true)]
    pub limit: usize,

    #[command(subcommand)]
    pub query: QueryKind,
}

#[derive(Subcommand)]
pub enum QueryKind {
    /// Item count per category
    Stats,

    /// Items with a summary score above a threshold
    TopScored {
        #[arg(long, value_name = "SCORE", default_value_t = 4.0)]
        min: f64,
    },

    /// Search keywords, applicability and titles
    Search {
        #[arg(value_name = "TERM")]
        term: String,
    },

    /// Items updated within the last N days
    Recent {
        #[arg(long, value_name = "DAYS", default_value_t = 30)]
        days: i64,
    },

    /// Items of one category with a given agent mode
    AgentMode {
        #[arg(long = "type", value_name = "CATEGORY")]
        category: String,

        #[arg(long, value_name = "MODE")]
        mode: String,
    },
}

fn print_items(items: &[ItemSummary]) {
    if items.is_empty() {
        println!("No matching items.");
        return;
    }
    for item in items {
        let score = item.summary_score.map(|s| format!("{s:.1}")).unwrap_or_else(|| "-".to_string());
        println!(
            "{:<13} {:<40} score {:>4}  {}",
            item.category,
            item.name,
            score,
            item.title.as_deref().unwrap_or("")
        );
    }
}

pub fn run(args: QueryArgs, config: &Config) -> Result<()> {
    let db_path = args.db.map(|p| config.resolve(&p)).unwrap_or_else(|| config.registry_db_path());
    let conn = open_read_only(&db_path)?;

    match args.query {
        QueryKind::Stats => {
            let counts = counts_by_type(&conn)?;
            let total: usize = counts.values().sum();
            println!("Registry: {}", db_path.display());
            for (category, count) in &counts {
                println!("  {:<13} {}", category, count);
            }
            println!("  {:<13} {}", "total", total);
        }
        QueryKind::TopScored { min } => print_items(&high_scoring(&conn, min, args.limit)?),
        QueryKind::Search { term } => print_items(&search(&conn, &term, args.limit)?),
        QueryKind::Recent { days } => {
            let since = recent_cutoff(Utc::now(), days);
            print_items(&recently_updated(&conn, since, args.limit)?)
        }
        QueryKind::AgentMode { category, mode } => {
            let parsed = Category::from_token(&category);
            if !parsed.is_known() {
                anyhow::bail!("Unknown category '{}'", category);
            }
            print_items(&by_agent_mode(&conn, parsed, &mode, args.limit)?)
        }
    }
    Ok(())
}
