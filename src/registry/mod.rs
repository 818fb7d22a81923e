//! Registry compilation.
//!
//! The registry is a pure function of the content tree: every compile scans
//! all category roots, extracts each header read-only and rebuilds the whole
//! index. Nothing is patched incrementally.

use crate::domain::{Category, Config, RunSummary, ScanStats};
use crate::error::ItemError;
use crate::metadata::{extract_metadata, DefaultContext, MetadataRecord};
use crate::scan::{scan_content_tree, ScannedFile};
use crate::utils::{classify_path, fingerprint_file, item_name};
use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub mod json;
pub mod query;
pub mod sqlite;

/// One compiled item: normalized metadata plus the computed fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistryEntry {
    #[serde(flatten)]
    pub record: MetadataRecord,
    pub path: String,
    pub md5sum: Option<String>,
}

impl RegistryEntry {
    /// Rebuild an entry from its JSON object form.
    pub fn from_json_map(map: &Map<String, Value>, author: &str, now: DateTime<Utc>) -> Self {
        let path = map.get("path").and_then(Value::as_str).unwrap_or_default().to_string();
        let ctx = DefaultContext::for_path(std::path::Path::new(&path), author, now);
        Self {
            record: MetadataRecord::from_json_map(map, &ctx),
            md5sum: map.get("md5sum").and_then(Value::as_str).map(str::to_string),
            path,
        }
    }
}

/// Category -> item name -> entry. Every known category is always present.
#[derive(Debug, Clone, PartialEq)]
pub struct Registry {
    categories: BTreeMap<Category, BTreeMap<String, RegistryEntry>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self { categories: Category::KNOWN.iter().map(|c| (*c, BTreeMap::new())).collect() }
    }

    /// Insert an entry. `Unknown` is rejected; a duplicate name replaces the
    /// previous entry and returns it.
    pub fn insert(
        &mut self,
        category: Category,
        name: String,
        entry: RegistryEntry,
    ) -> Result<Option<RegistryEntry>> {
        if !category.is_known() {
            bail!("Refusing to register '{}' under the unknown category", name);
        }
        Ok(self.categories.entry(category).or_default().insert(name, entry))
    }

    pub fn get(&self, category: Category, name: &str) -> Option<&RegistryEntry> {
        self.categories.get(&category)?.get(name)
    }

    pub fn len(&self) -> usize {
        self.categories.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &str, &RegistryEntry)> {
        self.categories.iter().flat_map(|(category, items)| {
            items.iter().map(move |(name, entry)| (*category, name.as_str(), entry))
        })
    }

    pub fn category_counts(&self) -> BTreeMap<Category, usize> {
        self.categories.iter().map(|(category, items)| (*category, items.len())).collect()
    }

    /// Hierarchical document form: `{category: {name: record}}`.
    pub fn to_json_value(&self) -> Result<Value> {
        let mut root = Map::new();
        for (category, items) in &self.categories {
            let mut section = Map::new();
            for (name, entry) in items {
                section.insert(name.clone(), serde_json::to_value(entry)?);
            }
            root.insert(category.as_str().to_string(), Value::Object(section));
        }
        Ok(Value::Object(root))
    }

    /// Parse the hierarchical document form. Unknown category keys are skipped
    /// with a warning; entries that are not objects are skipped.
    pub fn from_json_value(value: &Value, author: &str, now: DateTime<Utc>) -> Result<Self> {
        let Some(root) = value.as_object() else {
            bail!("Registry document must be an object keyed by category");
        };
        let mut registry = Registry::new();
        for (category_key, items) in root {
            let category = Category::from_token(category_key);
            if !category.is_known() {
                tracing::warn!("Skipping unknown registry section '{}'", category_key);
                continue;
            }
            let Some(items) = items.as_object() else {
                continue;
            };
            for (name, record) in items {
                if let Some(map) = record.as_object() {
                    registry.insert(category, name.clone(), RegistryEntry::from_json_map(map, author, now))?;
                }
            }
        }
        Ok(registry)
    }
}

enum CompiledItem {
    Entry(Category, String, RegistryEntry),
    Failed(String, ItemError),
}

fn compile_item(file: &ScannedFile, config: &Config, content_prefix: &str, now: DateTime<Utc>) -> CompiledItem {
    let category = classify_path(&file.relative_path);
    if !category.is_known() {
        tracing::warn!("Could not determine section for {}", file.relative_path);
        return CompiledItem::Failed(file.relative_path.clone(), ItemError::Unclassified);
    }

    let ctx = DefaultContext::for_path(&file.path, &config.default_author, now);
    let extracted = match extract_metadata(&file.path, &ctx) {
        Ok(extracted) => extracted,
        Err(err) => {
            tracing::warn!("Could not extract metadata from {}: {}", file.relative_path, err);
            return CompiledItem::Failed(file.relative_path.clone(), err);
        }
    };
    if let Some(issue) = &extracted.header_issue {
        tracing::warn!("Header of {} ignored: {}", file.relative_path, issue);
    }

    let entry = RegistryEntry {
        record: extracted.record,
        path: file.relative_path.clone(),
        md5sum: fingerprint_file(&file.path).as_digest().map(str::to_string),
    };
    CompiledItem::Entry(category, item_name(&file.relative_path, content_prefix), entry)
}

/// Compile the full registry from the current content tree.
///
/// Per-file failures (unreadable, unclassified, name collisions) are recorded
/// in the summary and the file is left out of the registry. When two paths
/// derive the same item name the later path wins and the earlier one is
/// reported.
pub fn compile_registry(config: &Config, now: DateTime<Utc>) -> Result<(Registry, RunSummary, ScanStats)> {
    let (files, stats) = scan_content_tree(config)?;
    let content_prefix = config.content_prefix();

    let compiled: Vec<CompiledItem> = if config.parallel {
        files.par_iter().map(|file| compile_item(file, config, &content_prefix, now)).collect()
    } else {
        files.iter().map(|file| compile_item(file, config, &content_prefix, now)).collect()
    };

    let mut registry = Registry::new();
    let mut summary = RunSummary::default();
    for item in compiled {
        summary.processed += 1;
        match item {
            CompiledItem::Entry(category, name, entry) => {
                let path = entry.path.clone();
                if let Some(previous) = registry.insert(category, name.clone(), entry)? {
                    tracing::warn!(
                        "Item name '{}' in {} produced by both {} and {}; keeping the latter",
                        name,
                        category,
                        previous.path,
                        path
                    );
                    summary.record_failure(previous.path, ItemError::DuplicateName(path));
                }
            }
            CompiledItem::Failed(path, err) => summary.record_failure(path, err),
        }
    }
    summary.per_category = registry.category_counts();

    Ok((registry, summary, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 6, 7, 8, 9).unwrap()
    }

    fn write(base: &Path, rel: &str, content: &str) {
        let path = base.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn fixture() -> (TempDir, Config) {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path();
        write(base, ".ai-ley/shared/personas/dev/engineer.md", "---\ntitle: Engineer\nsummaryScore: 4.5\n---\nbody\n");
        write(base, ".ai-ley/shared/instructions/foo.md", "---\ntitle: Foo\nkeywords: a, b\n---\n");
        write(base, ".ai-ley/shared/prompts/README.md", "ignored");
        write(base, ".ai-ley/shared/policies/.gitkeep", "");
        let config = Config::default().with_base_dir(base);
        (tmp, config)
    }

    #[test]
    fn compile_builds_category_name_mapping() {
        let (_tmp, config) = fixture();
        let (registry, summary, _) = compile_registry(&config, now()).unwrap();

        assert_eq!(registry.len(), 2);
        assert!(summary.failures.is_empty());
        let engineer = registry.get(Category::Personas, "personas_dev_engineer").unwrap();
        assert_eq!(engineer.path, ".ai-ley/shared/personas/dev/engineer.md");
        assert_eq!(engineer.record.summary_score, 4.5);
        assert_eq!(engineer.md5sum.as_deref().map(str::len), Some(32));

        let foo = registry.get(Category::Instructions, "instructions_foo").unwrap();
        assert_eq!(foo.record.keywords, vec!["a", "b"]);
        // Every known category is present even when empty.
        assert_eq!(registry.category_counts().len(), Category::KNOWN.len());
    }

    #[test]
    fn compile_is_read_only() {
        let (tmp, config) = fixture();
        let path = tmp.path().join(".ai-ley/shared/instructions/foo.md");
        let before = fs::read(&path).unwrap();
        compile_registry(&config, now()).unwrap();
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn compile_is_deterministic() {
        let (_tmp, config) = fixture();
        let (first, _, _) = compile_registry(&config, now()).unwrap();
        let (second, _, _) = compile_registry(&config, now()).unwrap();
        similar_asserts::assert_eq!(first, second);
    }

    #[test]
    fn unknown_category_roots_are_reported_and_excluded() {
        let (tmp, mut config) = fixture();
        write(tmp.path(), ".ai-ley/shared/docs/guide.md", "---\ntitle: Guide\n---\n");
        config.categories.push("docs".to_string());

        let (registry, summary, _) = compile_registry(&config, now()).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(summary.failures, vec![(".ai-ley/shared/docs/guide.md".to_string(), ItemError::Unclassified)]);
    }

    #[test]
    fn colliding_item_names_are_reported() {
        let (tmp, config) = fixture();
        write(tmp.path(), ".ai-ley/shared/personas/a/b.md", "---\ntitle: Nested\n---\n");
        write(tmp.path(), ".ai-ley/shared/personas/a_b.md", "---\ntitle: Flat\n---\n");

        let (registry, summary, _) = compile_registry(&config, now()).unwrap();
        assert_eq!(registry.get(Category::Personas, "personas_a_b").unwrap().record.title, "Flat");
        assert_eq!(
            summary.failures,
            vec![(
                ".ai-ley/shared/personas/a/b.md".to_string(),
                ItemError::DuplicateName(".ai-ley/shared/personas/a_b.md".to_string())
            )]
        );
        assert_eq!(summary.per_category[&Category::Personas], 2);
    }

    #[test]
    fn json_value_round_trip_preserves_entries() {
        let (_tmp, config) = fixture();
        let (registry, _, _) = compile_registry(&config, now()).unwrap();
        let value = registry.to_json_value().unwrap();
        assert_eq!(value["personas"]["personas_dev_engineer"]["title"], "Engineer");
        assert_eq!(value["personas"]["personas_dev_engineer"]["applyTo"], serde_json::json!(["general"]));
        assert!(value["workflows"].as_object().unwrap().is_empty());

        let parsed = Registry::from_json_value(&value, "AI-LEY", now()).unwrap();
        similar_asserts::assert_eq!(parsed, registry);
    }

    #[test]
    fn insert_rejects_unknown_category() {
        let mut registry = Registry::new();
        let entry = RegistryEntry::from_json_map(&Map::new(), "AI-LEY", now());
        assert!(registry.insert(Category::Unknown, "x".to_string(), entry).is_err());
    }
}
