//! Change detection against a previously compiled registry.

use crate::domain::Category;
use crate::utils::{classify_path, item_name, Fingerprint};
use rusqlite::{Connection, OpenFlags};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

pub mod worklist;

pub use worklist::{clear_worklist, read_worklist, write_worklist};

/// Fingerprints recorded by the previous registry, keyed by `(category, name)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriorSnapshot {
    /// No usable prior registry. Every scanned file is treated as changed.
    Missing,
    Loaded(HashMap<(Category, String), String>),
}

impl PriorSnapshot {
    /// Load from a JSON registry (`category -> name -> {md5sum, ...}`).
    ///
    /// A missing or unparseable file degrades to `Missing`.
    pub fn from_json_file(path: &Path) -> Self {
        if !path.exists() {
            tracing::info!("No prior registry at {}; full rebuild", path.display());
            return PriorSnapshot::Missing;
        }
        let parsed = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|text| serde_json::from_str::<Value>(&text).map_err(|e| e.to_string()));
        match parsed {
            Ok(value) => Self::from_json_value(&value).unwrap_or_else(|| {
                tracing::warn!("Registry {} is not a category map; full rebuild", path.display());
                PriorSnapshot::Missing
            }),
            Err(err) => {
                tracing::warn!("Error reading or parsing registry file {}: {}", path.display(), err);
                PriorSnapshot::Missing
            }
        }
    }

    pub fn from_json_value(value: &Value) -> Option<Self> {
        let categories = value.as_object()?;
        let mut entries = HashMap::new();
        for (category_key, items) in categories {
            let category = Category::from_token(category_key);
            let Some(items) = items.as_object() else {
                continue;
            };
            for (name, record) in items {
                if let Some(md5) = record.get("md5sum").and_then(Value::as_str) {
                    entries.insert((category, name.clone()), md5.to_string());
                }
            }
        }
        Some(PriorSnapshot::Loaded(entries))
    }

    /// Load from a SQLite registry. A missing file, missing table or any query
    /// error degrades to `Missing`.
    pub fn from_sqlite(path: &Path) -> Self {
        if !path.exists() {
            tracing::info!("No prior registry at {}; full rebuild", path.display());
            return PriorSnapshot::Missing;
        }
        match load_sqlite_fingerprints(path) {
            Ok(entries) => PriorSnapshot::Loaded(entries),
            Err(err) => {
                tracing::warn!("Could not read registry database {}: {}", path.display(), err);
                PriorSnapshot::Missing
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PriorSnapshot::Missing => 0,
            PriorSnapshot::Loaded(entries) => entries.len(),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, PriorSnapshot::Missing)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn load_sqlite_fingerprints(path: &Path) -> rusqlite::Result<HashMap<(Category, String), String>> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    let mut stmt = conn.prepare("SELECT type, name, md5sum FROM registry_items")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, Option<String>>(2)?))
    })?;
    let mut entries = HashMap::new();
    for row in rows {
        let (category, name, md5) = row?;
        if let Some(md5) = md5 {
            entries.insert((Category::from_token(&category), name), md5);
        }
    }
    Ok(entries)
}

/// Build the worklist: every path whose `(category, name)` has no prior
/// record, or whose recorded fingerprint differs from the current one.
///
/// Unavailable fingerprints and unclassifiable paths are always included.
/// Output is sorted by path.
pub fn compute_worklist(
    current: &BTreeMap<String, Fingerprint>,
    prior: &PriorSnapshot,
    content_prefix: &str,
) -> Vec<String> {
    let PriorSnapshot::Loaded(entries) = prior else {
        return current.keys().cloned().collect();
    };

    current
        .iter()
        .filter(|(rel_path, fingerprint)| {
            let category = classify_path(rel_path);
            if !category.is_known() {
                return true;
            }
            let key = (category, item_name(rel_path, content_prefix));
            match entries.get(&key) {
                None => true,
                Some(recorded) => !fingerprint.matches(recorded),
            }
        })
        .map(|(rel_path, _)| rel_path.clone())
        .collect()
}
