//! Hierarchical JSON encoding of the registry.

use super::Registry;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::Path;

/// Write the registry as pretty-printed JSON, replacing any existing file.
pub fn write_json_registry(path: &Path, registry: &Registry) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create registry directory {}", parent.display()))?;
    }
    let mut text = serde_json::to_string_pretty(&registry.to_json_value()?)?;
    text.push('\n');
    crate::utils::write_atomic(path, text.as_bytes())
        .with_context(|| format!("Failed to write registry {}", path.display()))
}

pub fn read_json_registry(path: &Path, author: &str, now: DateTime<Utc>) -> Result<Registry> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read registry {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("Invalid registry JSON: {}", path.display()))?;
    Registry::from_json_value(&value, author, now)
}
