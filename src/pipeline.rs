//! The three pipeline phases: scan, normalize and compile.
//!
//! Each phase is independently invocable and communicates with the others
//! only through on-disk artifacts (the worklist and the registry).

use crate::diff::{clear_worklist, compute_worklist, read_worklist, write_worklist, PriorSnapshot};
use crate::domain::{Config, RegistryFormat, RunSummary, ScanStats};
use crate::error::ItemError;
use crate::metadata::{normalize_file, NormalizeOutcome};
use crate::registry::{compile_registry, json, sqlite, Registry};
use crate::scan::scan_content_tree;
use crate::utils::{classify_path, fingerprint_file, Fingerprint};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Result of the change-detection phase.
#[derive(Debug)]
pub struct ScanReport {
    /// Base-relative path to fingerprint for every scanned file.
    pub fingerprints: BTreeMap<String, Fingerprint>,
    pub worklist: Vec<String>,
    pub worklist_path: PathBuf,
    /// Entries in the prior registry, `None` when it was missing or unusable.
    pub prior_entries: Option<usize>,
    pub stats: ScanStats,
}

#[derive(Debug)]
pub struct CompileReport {
    pub registry: Registry,
    pub summary: RunSummary,
    pub stats: ScanStats,
    pub output: PathBuf,
    pub format: RegistryFormat,
}

fn load_prior(config: &Config) -> PriorSnapshot {
    match config.format {
        RegistryFormat::Json => PriorSnapshot::from_json_file(&config.registry_json_path()),
        RegistryFormat::Sqlite => PriorSnapshot::from_sqlite(&config.registry_db_path()),
    }
}

/// Phase 1: fingerprint the content tree and write the worklist of files that
/// differ from the prior registry.
pub fn run_scan(config: &Config) -> Result<ScanReport> {
    let (files, stats) = scan_content_tree(config)?;

    let fingerprints: BTreeMap<String, Fingerprint> = if config.parallel {
        files.par_iter().map(|f| (f.relative_path.clone(), fingerprint_file(&f.path))).collect()
    } else {
        files.iter().map(|f| (f.relative_path.clone(), fingerprint_file(&f.path))).collect()
    };

    let prior = load_prior(config);
    let prior_entries = (!prior.is_missing()).then(|| prior.len());
    let worklist = compute_worklist(&fingerprints, &prior, &config.content_prefix());

    let worklist_path = config.worklist_file();
    write_worklist(&worklist_path, &worklist)?;
    tracing::info!("Wrote {} changed file(s) to {}", worklist.len(), worklist_path.display());

    Ok(ScanReport { fingerprints, worklist, worklist_path, prior_entries, stats })
}

/// Phase 2: normalize the headers of every worklist file.
///
/// A missing or empty worklist falls back to every file in the content tree.
/// The worklist is cleared once the pass completes.
pub fn run_normalize(config: &Config, now: DateTime<Utc>) -> Result<RunSummary> {
    let worklist_path = config.worklist_file();
    let targets = match read_worklist(&worklist_path)? {
        Some(items) if !items.is_empty() => items,
        _ => {
            tracing::info!("Worklist empty or missing; normalizing the full content tree");
            let (files, _) = scan_content_tree(config)?;
            files.into_iter().map(|f| f.relative_path).collect()
        }
    };

    let mut summary = RunSummary::default();
    for rel in &targets {
        summary.processed += 1;
        let path = config.base_dir.join(rel);
        if !path.is_file() {
            tracing::warn!("File not found: {}", rel);
            summary.record_failure(rel.clone(), ItemError::Missing);
            continue;
        }
        match normalize_file(&path, &config.default_author, now) {
            Ok(NormalizeOutcome::Updated { .. }) => summary.updated += 1,
            Ok(NormalizeOutcome::Unchanged) => summary.unchanged += 1,
            Err(err) => {
                tracing::warn!("Could not normalize {}: {}", rel, err);
                summary.record_failure(rel.clone(), err);
                continue;
            }
        }
        *summary.per_category.entry(classify_path(rel)).or_default() += 1;
    }

    clear_worklist(&worklist_path)?;
    Ok(summary)
}

/// Phase 3: rebuild the registry from the whole content tree and write it in
/// the requested format.
pub fn run_compile(config: &Config, format: RegistryFormat, now: DateTime<Utc>) -> Result<CompileReport> {
    let (registry, summary, stats) = compile_registry(config, now)?;

    let output = match format {
        RegistryFormat::Json => {
            let path = config.registry_json_path();
            json::write_json_registry(&path, &registry)?;
            path
        }
        RegistryFormat::Sqlite => {
            let path = config.registry_db_path();
            sqlite::write_registry_file(&path, &registry, now)?;
            path
        }
    };
    tracing::info!("Registry with {} item(s) written to {}", registry.len(), output.display());

    Ok(CompileReport { registry, summary, stats, output, format })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Category;
    use chrono::TimeZone;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 8, 9, 10, 11).unwrap()
    }

    fn write(base: &Path, rel: &str, content: &str) {
        let path = base.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn fixture() -> (TempDir, Config) {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), ".ai-ley/shared/personas/x.md", "---\ntitle: X\n---\nx body\n");
        write(tmp.path(), ".ai-ley/shared/prompts/y.md", "y body\n");
        let config = Config::default().with_base_dir(tmp.path());
        (tmp, config)
    }

    #[test]
    fn scan_without_prior_registry_lists_every_file() {
        let (_tmp, config) = fixture();
        let report = run_scan(&config).unwrap();
        assert_eq!(report.prior_entries, None);
        assert_eq!(
            report.worklist,
            vec![".ai-ley/shared/personas/x.md", ".ai-ley/shared/prompts/y.md"]
        );
        assert_eq!(read_worklist(&report.worklist_path).unwrap(), Some(report.worklist.clone()));
    }

    #[test]
    fn full_pipeline_converges_to_empty_worklist() {
        let (tmp, config) = fixture();
        run_scan(&config).unwrap();
        let summary = run_normalize(&config, now()).unwrap();
        assert_eq!(summary.updated, 2);
        assert_eq!(summary.per_category.get(&Category::Personas), Some(&1));
        assert_eq!(read_worklist(&config.worklist_file()).unwrap(), Some(Vec::new()));

        let compiled = run_compile(&config, RegistryFormat::Json, now()).unwrap();
        assert_eq!(compiled.registry.len(), 2);
        assert!(compiled.output.ends_with("variables/registry.json"));

        let rescan = run_scan(&config).unwrap();
        assert_eq!(rescan.prior_entries, Some(2));
        assert!(rescan.worklist.is_empty());

        write(tmp.path(), ".ai-ley/shared/prompts/y.md", "---\ntitle: Changed\n---\n");
        let rescan = run_scan(&config).unwrap();
        assert_eq!(rescan.worklist, vec![".ai-ley/shared/prompts/y.md"]);
    }

    #[test]
    fn sqlite_prior_is_used_when_format_is_sqlite() {
        let (_tmp, mut config) = fixture();
        config.format = RegistryFormat::Sqlite;
        run_compile(&config, RegistryFormat::Sqlite, now()).unwrap();

        let report = run_scan(&config).unwrap();
        assert_eq!(report.prior_entries, Some(2));
        assert!(report.worklist.is_empty());
    }

    #[test]
    fn normalize_falls_back_to_full_scan_and_reports_missing_files() {
        let (tmp, config) = fixture();
        let summary = run_normalize(&config, now()).unwrap();
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.updated, 2);

        let again = run_normalize(&config, now()).unwrap();
        assert_eq!(again.updated, 0);
        assert_eq!(again.unchanged, 2);

        write_worklist(&config.worklist_file(), &[".ai-ley/shared/personas/gone.md".to_string()]).unwrap();
        let missing = run_normalize(&config, now()).unwrap();
        assert_eq!(
            missing.failures,
            vec![(".ai-ley/shared/personas/gone.md".to_string(), ItemError::Missing)]
        );
        assert!(tmp.path().join(".project/WORKLIST.md").exists());
    }

    #[test]
    fn compile_leaves_content_untouched() {
        let (tmp, config) = fixture();
        let before = fs::read(tmp.path().join(".ai-ley/shared/prompts/y.md")).unwrap();
        run_compile(&config, RegistryFormat::Json, now()).unwrap();
        assert_eq!(fs::read(tmp.path().join(".ai-ley/shared/prompts/y.md")).unwrap(), before);
    }
}
