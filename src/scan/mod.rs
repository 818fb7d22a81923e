//! Content tree scanning

use crate::domain::{Config, ScanStats};
use anyhow::Result;

pub mod scanner;

pub use scanner::{ContentScanner, ScannedFile, TreeKind};

/// Scan every configured category root, returning files relative to the base
/// directory in sorted order.
pub fn scan_content_tree(config: &Config) -> Result<(Vec<ScannedFile>, ScanStats)> {
    let mut files = Vec::new();
    let mut stats = ScanStats::default();
    for (name, root) in config.category_roots() {
        if !root.is_dir() {
            tracing::warn!("Folder for '{}' not found at {}", name, root.display());
            continue;
        }
        let mut scanner = ContentScanner::for_config(root, config);
        files.extend(scanner.scan()?);
        stats.absorb(scanner.stats());
    }
    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    files.dedup_by(|a, b| a.relative_path == b.relative_path);
    Ok((files, stats))
}
