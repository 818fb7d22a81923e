//! Mirror a source content tree into a target tree by fingerprint.
//!
//! Only files that are missing from the target or whose fingerprints differ
//! are copied. Files present only in the target are left alone.

use crate::domain::Config;
use crate::error::ItemError;
use crate::scan::{ContentScanner, ScannedFile, TreeKind};
use crate::utils::{fingerprint_file, Fingerprint};
use anyhow::Result;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Relative paths grouped by what the mirror has to do with them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    /// Present in the source only.
    pub added: Vec<String>,
    /// Present in both with different (or unavailable) fingerprints.
    pub modified: Vec<String>,
    pub unchanged: Vec<String>,
}

impl SyncPlan {
    pub fn to_copy(&self) -> impl Iterator<Item = &String> {
        self.added.iter().chain(self.modified.iter())
    }

    pub fn copy_count(&self) -> usize {
        self.added.len() + self.modified.len()
    }

    pub fn is_empty(&self) -> bool {
        self.copy_count() == 0
    }
}

#[derive(Debug, Default)]
pub struct SyncOutcome {
    pub copied: Vec<String>,
    pub failed: Vec<(String, ItemError)>,
}

/// Fingerprint every included file under `root`, keyed by root-relative path.
///
/// A missing root yields an empty map.
pub fn folder_hashes(root: &Path, config: &Config, kind: TreeKind) -> Result<BTreeMap<String, Fingerprint>> {
    if !root.is_dir() {
        tracing::debug!("No tree at {}; treating it as empty", root.display());
        return Ok(BTreeMap::new());
    }
    let scanner = ContentScanner::new(root.to_path_buf())
        .excluded_names(config.excluded_names.clone())
        .exclude_globs(config.exclude_globs.clone())
        .builder_exclude_globs(config.builder_exclude_globs.clone())
        .kind(kind);
    let files: Vec<ScannedFile> = scanner.files()?.collect();

    let hashes = if config.parallel {
        files.par_iter().map(|f| (f.relative_path.clone(), fingerprint_file(&f.path))).collect()
    } else {
        files.iter().map(|f| (f.relative_path.clone(), fingerprint_file(&f.path))).collect()
    };
    Ok(hashes)
}

/// Compare two fingerprint maps.
pub fn diff_hashes(
    source: &BTreeMap<String, Fingerprint>,
    target: &BTreeMap<String, Fingerprint>,
) -> SyncPlan {
    let mut plan = SyncPlan::default();
    for (rel, fingerprint) in source {
        match target.get(rel) {
            None => plan.added.push(rel.clone()),
            Some(existing) => {
                let same = match (fingerprint.as_digest(), existing.as_digest()) {
                    (Some(a), Some(b)) => a == b,
                    _ => false,
                };
                if same {
                    plan.unchanged.push(rel.clone());
                } else {
                    plan.modified.push(rel.clone());
                }
            }
        }
    }
    plan
}

pub fn plan_sync(source: &Path, target: &Path, config: &Config, kind: TreeKind) -> Result<SyncPlan> {
    let source_hashes = folder_hashes(source, config, kind)?;
    let target_hashes = folder_hashes(target, config, kind)?;
    let plan = diff_hashes(&source_hashes, &target_hashes);
    tracing::debug!(
        "Sync plan: {} added, {} modified, {} unchanged",
        plan.added.len(),
        plan.modified.len(),
        plan.unchanged.len()
    );
    Ok(plan)
}

fn copy_one(source: &Path, target: &Path, rel: &str) -> Result<(), ItemError> {
    let from = source.join(rel);
    let to = target.join(rel);
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|e| ItemError::Write(e.to_string()))?;
    }
    fs::copy(&from, &to).map_err(|e| ItemError::Write(e.to_string()))?;
    Ok(())
}

/// Copy every added or modified file. Per-file failures are collected.
pub fn apply_sync_plan(source: &Path, target: &Path, plan: &SyncPlan) -> SyncOutcome {
    let mut outcome = SyncOutcome::default();
    for rel in plan.to_copy() {
        match copy_one(source, target, rel) {
            Ok(()) => {
                tracing::info!("Synced {}", rel);
                outcome.copied.push(rel.clone());
            }
            Err(err) => {
                tracing::warn!("Failed to sync {}: {}", rel, err);
                outcome.failed.push((rel.clone(), err));
            }
        }
    }
    outcome
}
