//! Core domain types shared by every phase of the pipeline.

use crate::error::ItemError;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Content category, derived from the directory a file lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Personas,
    Instructions,
    Workflows,
    Schemas,
    Prompts,
    Policies,
    Unknown,
}

impl Category {
    /// Known categories in classification priority order.
    pub const KNOWN: [Category; 6] = [
        Category::Personas,
        Category::Instructions,
        Category::Workflows,
        Category::Schemas,
        Category::Prompts,
        Category::Policies,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Personas => "personas",
            Category::Instructions => "instructions",
            Category::Workflows => "workflows",
            Category::Schemas => "schemas",
            Category::Prompts => "prompts",
            Category::Policies => "policies",
            Category::Unknown => "unknown",
        }
    }

    /// Parse a directory token. Case-sensitive; anything else is `Unknown`.
    pub fn from_token(token: &str) -> Category {
        Category::KNOWN.iter().copied().find(|c| c.as_str() == token).unwrap_or(Category::Unknown)
    }

    pub fn is_known(&self) -> bool {
        *self != Category::Unknown
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical encoding of the compiled registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryFormat {
    #[default]
    Json,
    Sqlite,
}

impl std::str::FromStr for RegistryFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(RegistryFormat::Json),
            "sqlite" | "db" => Ok(RegistryFormat::Sqlite),
            other => Err(format!("Invalid registry format '{other}' (expected json or sqlite)")),
        }
    }
}

/// Pipeline configuration, constructed once at the entry point and passed to
/// every phase by reference.
///
/// Relative paths are resolved against `base_dir`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(skip)]
    pub base_dir: PathBuf,

    /// Directory holding the category roots, relative to `base_dir`.
    pub content_root: PathBuf,

    /// Category root directory names scanned under `content_root`.
    #[serde(deserialize_with = "deserialize_string_list")]
    pub categories: Vec<String>,

    pub registry_json: Option<PathBuf>,
    pub registry_db: Option<PathBuf>,
    pub worklist_path: PathBuf,

    #[serde(deserialize_with = "deserialize_string_list")]
    pub excluded_names: Vec<String>,

    #[serde(deserialize_with = "deserialize_string_list")]
    pub exclude_globs: Vec<String>,

    #[serde(deserialize_with = "deserialize_string_list")]
    pub builder_exclude_globs: Vec<String>,

    pub default_author: String,
    pub format: RegistryFormat,

    /// Fingerprint and extract on a rayon pool.
    pub parallel: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            content_root: PathBuf::from(".ai-ley/shared"),
            categories: Category::KNOWN.iter().map(|c| c.as_str().to_string()).collect(),
            registry_json: None,
            registry_db: None,
            worklist_path: PathBuf::from(".project/WORKLIST.md"),
            excluded_names: default_excluded_names().iter().map(|s| s.to_string()).collect(),
            exclude_globs: default_exclude_globs().iter().map(|s| s.to_string()).collect(),
            builder_exclude_globs: default_builder_exclude_globs()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            default_author: "AI-LEY".to_string(),
            format: RegistryFormat::Json,
            parallel: true,
        }
    }
}

impl Config {
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn content_dir(&self) -> PathBuf {
        self.resolve(&self.content_root)
    }

    /// `(name, absolute root)` for every configured category directory.
    pub fn category_roots(&self) -> Vec<(String, PathBuf)> {
        let content_dir = self.content_dir();
        self.categories.iter().map(|name| (name.clone(), content_dir.join(name))).collect()
    }

    pub fn registry_json_path(&self) -> PathBuf {
        match &self.registry_json {
            Some(path) => self.resolve(path),
            None => self.content_dir().join("variables").join("registry.json"),
        }
    }

    pub fn registry_db_path(&self) -> PathBuf {
        match &self.registry_db {
            Some(path) => self.resolve(path),
            None => self.content_dir().join("variables").join("registry.db"),
        }
    }

    pub fn worklist_file(&self) -> PathBuf {
        self.resolve(&self.worklist_path)
    }

    /// Content root as a `/`-separated prefix of base-relative paths.
    pub fn content_prefix(&self) -> String {
        crate::utils::normalize_path(&self.content_root.to_string_lossy())
            .trim_end_matches('/')
            .to_string()
    }
}

pub fn default_excluded_names() -> &'static [&'static str] {
    &["README.md", "CHANGES.md", ".gitkeep"]
}

pub fn default_exclude_globs() -> &'static [&'static str] {
    &[
        "**/node_modules/**",
        "**/.next/**",
        "**/dist/**",
        "**/build/**",
        "**/.git/**",
        "**/__pycache__/**",
        "**/.DS_Store",
        "**/*.tmp",
        "**/*.log",
        "**/package-lock.json",
        "**/yarn.lock",
    ]
}

pub fn default_builder_exclude_globs() -> &'static [&'static str] {
    &["**/.env.local", "**/.env.production", "**/public/exports/**"]
}

/// Accept either a list of strings or a single comma-separated string.
fn deserialize_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrList {
        One(String),
        Many(Vec<String>),
    }

    let items = match StringOrList::deserialize(deserializer)? {
        StringOrList::One(value) => value.split(',').map(str::to_string).collect::<Vec<_>>(),
        StringOrList::Many(values) => values,
    };
    Ok(items.into_iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
}

/// Counters collected while walking a content tree.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanStats {
    pub files_scanned: usize,
    pub files_included: usize,
    pub files_skipped_name: usize,
    pub files_skipped_hidden: usize,
    pub files_skipped_glob: usize,
    /// Links to directories and dangling links.
    pub links_skipped: usize,
    pub walk_errors: usize,
}

impl ScanStats {
    pub fn files_skipped(&self) -> usize {
        self.files_skipped_name + self.files_skipped_hidden + self.files_skipped_glob + self.links_skipped
    }

    pub fn absorb(&mut self, other: &ScanStats) {
        self.files_scanned += other.files_scanned;
        self.files_included += other.files_included;
        self.files_skipped_name += other.files_skipped_name;
        self.files_skipped_hidden += other.files_skipped_hidden;
        self.files_skipped_glob += other.files_skipped_glob;
        self.links_skipped += other.links_skipped;
        self.walk_errors += other.walk_errors;
    }
}

/// End-of-run summary for a phase. Per-item failures are aggregated here
/// instead of aborting the phase.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub processed: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub per_category: BTreeMap<Category, usize>,
    pub failures: Vec<(String, ItemError)>,
}

impl RunSummary {
    pub fn record_failure(&mut self, path: impl Into<String>, error: ItemError) {
        self.failures.push((path.into(), error));
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }
}
