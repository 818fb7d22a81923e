//! Read-only queries over the relational registry.

use crate::domain::Category;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OpenFlags, Row};
use std::collections::BTreeMap;
use std::path::Path;

/// Row projection shared by the listing queries.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemSummary {
    pub category: String,
    pub name: String,
    pub path: String,
    pub title: Option<String>,
    pub summary_score: Option<f64>,
    pub last_updated: Option<String>,
}

const SUMMARY_COLUMNS: &str = "type, name, path, title, summary_score, last_updated";

fn summary_from_row(row: &Row<'_>) -> rusqlite::Result<ItemSummary> {
    Ok(ItemSummary {
        category: row.get(0)?,
        name: row.get(1)?,
        path: row.get(2)?,
        title: row.get(3)?,
        summary_score: row.get(4)?,
        last_updated: row.get(5)?,
    })
}

fn collect_summaries(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<ItemSummary>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, summary_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Open an existing registry database without write access.
pub fn open_read_only(path: &Path) -> Result<Connection> {
    if !path.exists() {
        bail!("Registry database not found at {}. Run `content-registry compile --format sqlite` first.", path.display());
    }
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .with_context(|| format!("Failed to open SQLite database at {}", path.display()))?;
    let has_items: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'registry_items'",
        [],
        |row| row.get(0),
    )?;
    if has_items == 0 {
        bail!("Registry schema not found in {}", path.display());
    }
    Ok(conn)
}

/// Item count per category, including categories with no rows.
pub fn counts_by_type(conn: &Connection) -> Result<BTreeMap<String, usize>> {
    let mut counts: BTreeMap<String, usize> =
        Category::KNOWN.iter().map(|c| (c.as_str().to_string(), 0)).collect();
    let mut stmt = conn.prepare("SELECT type, COUNT(*) FROM registry_items GROUP BY type")?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
    for row in rows {
        let (category, count) = row?;
        counts.insert(category, count.max(0) as usize);
    }
    Ok(counts)
}

/// Items whose summary score is strictly above `min_score`, best first.
pub fn high_scoring(conn: &Connection, min_score: f64, limit: usize) -> Result<Vec<ItemSummary>> {
    let sql = format!(
        "SELECT {SUMMARY_COLUMNS} FROM registry_items
         WHERE summary_score > ?1
         ORDER BY summary_score DESC, type, name
         LIMIT ?2"
    );
    collect_summaries(conn, &sql, params![min_score, limit as i64])
}

/// Substring search over keywords, applicability and title.
pub fn search(conn: &Connection, term: &str, limit: usize) -> Result<Vec<ItemSummary>> {
    let pattern = format!("%{}%", term.trim());
    let sql = format!(
        "SELECT {SUMMARY_COLUMNS} FROM registry_items
         WHERE keywords LIKE ?1 OR apply_to LIKE ?1 OR title LIKE ?1
         ORDER BY type, name
         LIMIT ?2"
    );
    collect_summaries(conn, &sql, params![pattern, limit as i64])
}

/// Lower bound for a "last N days" window ending at `now`.
///
/// Negative windows count as zero. `None` means the window reaches further
/// back than any representable date, so every dated item qualifies.
pub fn recent_cutoff(now: DateTime<Utc>, days: i64) -> Option<DateTime<Utc>> {
    Duration::try_days(days.max(0)).and_then(|window| now.checked_sub_signed(window))
}

/// Items with a parseable update time at or after `since`, newest first.
/// `None` applies no lower bound.
pub fn recently_updated(
    conn: &Connection,
    since: Option<DateTime<Utc>>,
    limit: usize,
) -> Result<Vec<ItemSummary>> {
    let sql = format!(
        "SELECT {SUMMARY_COLUMNS} FROM registry_items
         WHERE last_updated IS NOT NULL AND (?1 IS NULL OR last_updated >= ?1)
         ORDER BY last_updated DESC, type, name
         LIMIT ?2"
    );
    let since = since.map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string());
    collect_summaries(conn, &sql, params![since, limit as i64])
}

/// Items of one category with the given agent mode.
pub fn by_agent_mode(
    conn: &Connection,
    category: Category,
    agent_mode: &str,
    limit: usize,
) -> Result<Vec<ItemSummary>> {
    let sql = format!(
        "SELECT {SUMMARY_COLUMNS} FROM registry_items
         WHERE type = ?1 AND agent_mode = ?2
         ORDER BY name
         LIMIT ?3"
    );
    collect_summaries(conn, &sql, params![category.as_str(), agent_mode, limit as i64])
}
