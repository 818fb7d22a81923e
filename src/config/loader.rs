//! Config file loading

use crate::domain::Config;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level key that may wrap the settings in a shared config file.
const NESTED_SECTION: &str = "content-registry";

const CANDIDATES: [&str; 4] = [
    "content-registry.toml",
    ".content-registry.toml",
    "content-registry.yml",
    "content-registry.yaml",
];

/// Load the configuration for `base_dir`.
///
/// An explicit `config_path` must parse; an auto-discovered file that fails to
/// parse is ignored with a warning. `base_dir` is always taken from the caller.
pub fn load_config(base_dir: &Path, config_path: Option<&Path>) -> Result<Config> {
    let config_path_provided = config_path.is_some();

    let discovered = match config_path {
        Some(path) => Some(path.to_path_buf()),
        None => discover_config(base_dir),
    };

    let Some(config_file) = discovered else {
        return Ok(Config::default().with_base_dir(base_dir));
    };

    let content = fs::read_to_string(&config_file)
        .with_context(|| format!("Failed reading config file: {}", config_file.display()))?;

    let ext = config_file.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "toml" => parse_toml_config(&content, &config_file),
        "yaml" | "yml" => parse_yaml_config(&content, &config_file),
        other => Err(anyhow::anyhow!(
            "Unsupported config extension '.{}' for file {}",
            other,
            config_file.display()
        )),
    };

    match parsed {
        Ok(cfg) => {
            tracing::debug!("Loaded config from {}", config_file.display());
            Ok(cfg.with_base_dir(base_dir))
        }
        Err(e) if config_path_provided => Err(e),
        Err(e) => {
            tracing::warn!("Failed to parse auto-discovered config {}: {:#}", config_file.display(), e);
            Ok(Config::default().with_base_dir(base_dir))
        }
    }
}

/// Parse TOML config, supporting a nested `[content-registry]` section.
fn parse_toml_config(content: &str, config_file: &Path) -> Result<Config> {
    let raw: toml::Value = toml::from_str(content)
        .with_context(|| format!("Invalid TOML syntax: {}", config_file.display()))?;

    let config_val = match raw.get(NESTED_SECTION) {
        Some(nested) => nested.clone(),
        None => raw,
    };

    config_val.try_into().with_context(|| format!("Invalid TOML config: {}", config_file.display()))
}

/// Parse YAML config, supporting a nested `content-registry:` section.
fn parse_yaml_config(content: &str, config_file: &Path) -> Result<Config> {
    let raw: serde_yaml::Value = serde_yaml::from_str(content)
        .with_context(|| format!("Invalid YAML syntax: {}", config_file.display()))?;

    let config_val = match raw.get(NESTED_SECTION) {
        Some(nested) => nested.clone(),
        None => raw,
    };

    serde_yaml::from_value(config_val)
        .with_context(|| format!("Invalid YAML config: {}", config_file.display()))
}

fn discover_config(base_dir: &Path) -> Option<PathBuf> {
    CANDIDATES.iter().map(|candidate| base_dir.join(candidate)).find(|path| path.exists())
}
