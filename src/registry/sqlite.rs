//! Relational encoding of the registry.
//!
//! One row per item in `registry_items`. A compile clears and refills the
//! table inside a single transaction; if any insert fails the transaction is
//! dropped and the previously committed rows stay visible.

use super::{Registry, RegistryEntry};
use crate::domain::Category;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection, Transaction};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

pub const SCHEMA_VERSION: i64 = 1;

/// Text layout of `last_updated`, comparable with SQLite's `datetime()`.
const SQL_DATETIME: &str = "%Y-%m-%d %H:%M:%S";

pub fn open_or_create(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create registry directory {}", parent.display()))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open SQLite database at {}", path.display()))?;
    ensure_schema(&conn)?;
    Ok(conn)
}

const CREATE_ITEMS: &str = "
    CREATE TABLE IF NOT EXISTS registry_items (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        type TEXT NOT NULL,
        name TEXT NOT NULL,
        path TEXT UNIQUE NOT NULL,
        title TEXT,
        description TEXT,
        version TEXT,
        author TEXT,
        last_updated DATETIME,
        last_updated_raw TEXT,
        md5sum TEXT,
        summary_score REAL,
        apply_to TEXT,
        keywords TEXT,
        extensions TEXT,
        agent_mode TEXT,
        instruction_type TEXT,
        guidelines TEXT,
        extra TEXT NOT NULL DEFAULT '{}',
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        UNIQUE (type, name)
    );
";

const CREATE_INDEXES: &str = "
    CREATE INDEX IF NOT EXISTS idx_type ON registry_items(type);
    CREATE INDEX IF NOT EXISTS idx_path ON registry_items(path);
    CREATE INDEX IF NOT EXISTS idx_title ON registry_items(title);
    CREATE INDEX IF NOT EXISTS idx_score ON registry_items(summary_score);
    CREATE INDEX IF NOT EXISTS idx_agent_mode ON registry_items(agent_mode);
    CREATE INDEX IF NOT EXISTS idx_instruction_type ON registry_items(instruction_type);
    CREATE INDEX IF NOT EXISTS idx_last_updated ON registry_items(last_updated);
";

/// Every `registry_items` column, in table order.
const ITEM_COLUMNS: [&str; 21] = [
    "id",
    "type",
    "name",
    "path",
    "title",
    "description",
    "version",
    "author",
    "last_updated",
    "last_updated_raw",
    "md5sum",
    "summary_score",
    "apply_to",
    "keywords",
    "extensions",
    "agent_mode",
    "instruction_type",
    "guidelines",
    "extra",
    "created_at",
    "updated_at",
];

/// Columns missing from the original single-table layout, which predates
/// `schema_version`.
const ADDED_COLUMNS: [&str; 2] = ["last_updated_raw", "extra"];

fn item_columns(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info('registry_items')")?;
    let columns = stmt.query_map([], |row| row.get(0))?.collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(columns)
}

pub fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let current: Option<i64> =
        conn.query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0)).ok();
    let columns = item_columns(conn)?;
    let legacy_layout =
        !columns.is_empty() && ADDED_COLUMNS.iter().any(|added| !columns.iter().any(|c| c == added));

    match current {
        Some(version) if version != SCHEMA_VERSION => {
            // Rows are derived from the content tree; the next compile refills them.
            tracing::warn!(
                "Registry schema version {} does not match {}; recreating registry_items",
                version,
                SCHEMA_VERSION
            );
            conn.execute_batch("DROP TABLE IF EXISTS registry_items;")?;
        }
        _ if legacy_layout => migrate_legacy_items(conn, &columns)?,
        _ => {}
    }

    conn.execute_batch(CREATE_ITEMS)?;
    conn.execute_batch(CREATE_INDEXES)?;

    if current != Some(SCHEMA_VERSION) {
        conn.execute("DELETE FROM schema_version", [])?;
        conn.execute("INSERT INTO schema_version(version) VALUES(?1)", [SCHEMA_VERSION])?;
    }
    Ok(())
}

/// Upgrade a `registry_items` table written in the original layout.
///
/// The table is rebuilt rather than altered so it picks up the
/// `(type, name)` uniqueness constraint. Shared columns are copied as-is and
/// `last_updated_raw` starts out as the old `last_updated` text.
fn migrate_legacy_items(conn: &Connection, legacy_columns: &[String]) -> Result<()> {
    tracing::info!("Upgrading registry_items from the original single-table layout");
    let shared = ITEM_COLUMNS
        .iter()
        .copied()
        .filter(|column| legacy_columns.iter().any(|c| c == column))
        .collect::<Vec<_>>()
        .join(", ");

    let tx = conn.unchecked_transaction()?;
    tx.execute_batch("ALTER TABLE registry_items RENAME TO registry_items_legacy;")?;
    tx.execute_batch(CREATE_ITEMS)?;
    tx.execute_batch(&format!(
        "
        INSERT OR IGNORE INTO registry_items ({shared})
        SELECT {shared} FROM registry_items_legacy;

        UPDATE registry_items SET last_updated_raw = last_updated WHERE last_updated_raw IS NULL;

        DROP TABLE registry_items_legacy;
        "
    ))
    .context("Failed to copy rows out of the legacy registry_items table")?;
    tx.commit()?;
    Ok(())
}

/// Parse an ISO-8601 timestamp into SQLite's datetime text form (UTC).
///
/// Accepts RFC 3339 (including a `Z` suffix), naive date-times with `T` or a
/// space separator, and bare dates. Anything else is `None`.
pub fn parse_last_updated(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc).format(SQL_DATETIME).to_string());
    }
    for layout in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, layout) {
            return Some(naive.format(SQL_DATETIME).to_string());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.format(SQL_DATETIME).to_string())
}

fn insert_entry(
    tx: &Transaction<'_>,
    category: Category,
    name: &str,
    entry: &RegistryEntry,
    updated_at: &str,
) -> Result<()> {
    let record = &entry.record;
    let last_updated = parse_last_updated(&record.last_updated);
    if last_updated.is_none() {
        tracing::debug!("Unparseable lastUpdated '{}' for {}", record.last_updated, entry.path);
    }

    tx.execute(
        "
        INSERT INTO registry_items (
            type, name, path, title, description, version, author,
            last_updated, last_updated_raw, md5sum, summary_score, apply_to, keywords,
            extensions, agent_mode, instruction_type, guidelines, extra, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)
        ",
        params![
            category.as_str(),
            name,
            &entry.path,
            &record.title,
            &record.description,
            &record.version,
            &record.author,
            last_updated,
            &record.last_updated,
            &entry.md5sum,
            record.summary_score,
            serde_json::to_string(&record.apply_to)?,
            serde_json::to_string(&record.keywords)?,
            serde_json::to_string(&record.extensions)?,
            &record.agent_mode,
            &record.instruction_type,
            &record.guidelines,
            serde_json::to_string(&record.extra)?,
            updated_at,
        ],
    )
    .with_context(|| format!("Failed to insert {} ({})", entry.path, name))?;
    Ok(())
}

/// Replace the table contents with `registry` in one transaction.
///
/// Returns the number of rows written. On error nothing is committed.
pub fn write_registry(conn: &mut Connection, registry: &Registry, now: DateTime<Utc>) -> Result<usize> {
    let updated_at = now.format(SQL_DATETIME).to_string();
    let tx = conn.transaction()?;

    tx.execute("DELETE FROM registry_items", [])?;

    let mut written = 0usize;
    for (category, name, entry) in registry.iter() {
        insert_entry(&tx, category, name, entry, &updated_at)?;
        written += 1;
    }

    tx.commit()?;
    Ok(written)
}

/// Open (creating if needed) and rebuild the registry database at `path`.
pub fn write_registry_file(path: &Path, registry: &Registry, now: DateTime<Utc>) -> Result<usize> {
    let mut conn = open_or_create(path)?;
    write_registry(&mut conn, registry, now)
}

fn parse_json_list(text: Option<String>) -> Option<Value> {
    text.and_then(|t| serde_json::from_str::<Value>(&t).ok())
}

/// Read the table back into the hierarchical shape.
pub fn read_registry(conn: &Connection, author: &str, now: DateTime<Utc>) -> Result<Registry> {
    let mut stmt = conn.prepare(
        "
        SELECT type, name, path, title, description, version, author, last_updated_raw,
               md5sum, summary_score, apply_to, keywords, extensions, agent_mode,
               instruction_type, guidelines, extra
        FROM registry_items
        ORDER BY type, name
        ",
    )?;

    let rows = stmt.query_map([], |row| {
        let category: String = row.get(0)?;
        let name: String = row.get(1)?;
        let mut map = Map::new();
        map.insert("path".to_string(), Value::from(row.get::<_, String>(2)?));

        let text_columns = [
            (3, "title"),
            (4, "description"),
            (5, "version"),
            (6, "author"),
            (7, "lastUpdated"),
            (8, "md5sum"),
            (13, "agentMode"),
            (14, "instructionType"),
            (15, "guidelines"),
        ];
        for (idx, key) in text_columns {
            if let Some(value) = row.get::<_, Option<String>>(idx)? {
                map.insert(key.to_string(), Value::from(value));
            }
        }
        if let Some(score) = row.get::<_, Option<f64>>(9)? {
            map.insert("summaryScore".to_string(), Value::from(score));
        }
        for (idx, key) in [(10, "applyTo"), (11, "keywords"), (12, "extensions")] {
            if let Some(list) = parse_json_list(row.get(idx)?) {
                map.insert(key.to_string(), list);
            }
        }
        let extra: String = row.get(16)?;
        Ok((category, name, map, extra))
    })?;

    let mut registry = Registry::new();
    for row in rows {
        let (category_key, name, mut map, extra) = row?;
        let category = Category::from_token(&category_key);
        if !category.is_known() {
            tracing::warn!("Skipping registry row '{}' with unknown type '{}'", name, category_key);
            continue;
        }
        if let Ok(Value::Object(extra)) = serde_json::from_str::<Value>(&extra) {
            for (key, value) in extra {
                map.entry(key).or_insert(value);
            }
        }
        registry.insert(category, name, RegistryEntry::from_json_map(&map, author, now))?;
    }
    Ok(registry)
}

/// Load a JSON registry and write it into the relational store.
pub fn migrate_json_to_sqlite(
    json_path: &Path,
    db_path: &Path,
    author: &str,
    now: DateTime<Utc>,
) -> Result<usize> {
    let registry = super::json::read_json_registry(json_path, author, now)?;
    write_registry_file(db_path, &registry, now)
}
