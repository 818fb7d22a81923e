//! CLI flag overrides applied on top of the loaded config file.

use crate::domain::Config;
use std::path::PathBuf;

/// Values given on the command line. `None` keeps the file/default value.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub content_root: Option<PathBuf>,
    pub categories: Option<Vec<String>>,
    pub registry_json: Option<PathBuf>,
    pub registry_db: Option<PathBuf>,
    pub worklist_path: Option<PathBuf>,
    pub default_author: Option<String>,
    pub no_parallel: bool,
}

pub fn merge_cli_with_config(mut config: Config, overrides: &CliOverrides) -> Config {
    if let Some(root) = &overrides.content_root {
        config.content_root = root.clone();
    }
    if let Some(categories) = &overrides.categories {
        config.categories = categories.clone();
    }
    if let Some(path) = &overrides.registry_json {
        config.registry_json = Some(path.clone());
    }
    if let Some(path) = &overrides.registry_db {
        config.registry_db = Some(path.clone());
    }
    if let Some(path) = &overrides.worklist_path {
        config.worklist_path = path.clone();
    }
    if let Some(author) = &overrides.default_author {
        config.default_author = author.clone();
    }
    if overrides.no_parallel {
        config.parallel = false;
    }
    config
}
