//! Content tree scanner with name, hidden-file and glob exclusions

use crate::domain::ScanStats;
use crate::utils::{normalize_path, relative_to};
use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::{DirEntry, WalkBuilder};
use std::path::{Path, PathBuf};

/// Which exclusion rule set applies to a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeKind {
    #[default]
    Content,
    /// The builder tree additionally skips local env files and generated exports.
    Builder,
}

/// A file leaf discovered under a scan root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    pub path: PathBuf,
    /// Relative to the scanner's `relative_to` base, `/`-separated.
    pub relative_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exclusion {
    Name,
    Hidden,
    Glob,
}

/// Outcome of visiting one walk entry.
enum Visit {
    File(ScannedFile),
    Excluded(Exclusion),
    /// A link to a directory, or a link whose target is gone.
    LinkSkipped,
    WalkError,
}

/// Discovers content files under a root directory.
pub struct ContentScanner {
    root_path: PathBuf,
    relative_base: PathBuf,
    excluded_names: Vec<String>,
    exclude_globs: Vec<String>,
    builder_exclude_globs: Vec<String>,
    kind: TreeKind,
    stats: ScanStats,
}

impl ContentScanner {
    /// Create a scanner with the default exclusion sets.
    pub fn new(root_path: PathBuf) -> Self {
        Self {
            relative_base: root_path.clone(),
            root_path,
            excluded_names: crate::domain::default_excluded_names()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            exclude_globs: crate::domain::default_exclude_globs()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            builder_exclude_globs: crate::domain::default_builder_exclude_globs()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            kind: TreeKind::Content,
            stats: ScanStats::default(),
        }
    }

    /// Scanner for a category root, configured from the pipeline config.
    pub fn for_config(root_path: PathBuf, config: &crate::domain::Config) -> Self {
        Self::new(root_path)
            .relative_to(config.base_dir.clone())
            .excluded_names(config.excluded_names.clone())
            .exclude_globs(config.exclude_globs.clone())
            .builder_exclude_globs(config.builder_exclude_globs.clone())
    }

    /// Base directory that `ScannedFile::relative_path` is computed against
    pub fn relative_to(mut self, base: PathBuf) -> Self {
        self.relative_base = base;
        self
    }

    /// Set exact file names to skip
    pub fn excluded_names(mut self, names: Vec<String>) -> Self {
        self.excluded_names = names;
        self
    }

    /// Set glob patterns to exclude
    pub fn exclude_globs(mut self, globs: Vec<String>) -> Self {
        self.exclude_globs = globs;
        self
    }

    /// Set glob patterns that only apply to the builder tree
    pub fn builder_exclude_globs(mut self, globs: Vec<String>) -> Self {
        self.builder_exclude_globs = globs;
        self
    }

    pub fn kind(mut self, kind: TreeKind) -> Self {
        self.kind = kind;
        self
    }

    fn build_exclude_globset(&self) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        let mut patterns: Vec<&String> = self.exclude_globs.iter().collect();
        if self.kind == TreeKind::Builder {
            patterns.extend(self.builder_exclude_globs.iter());
        }
        for pattern in patterns {
            match Glob::new(pattern) {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(err) => tracing::warn!("Ignoring invalid exclude glob '{}': {}", pattern, err),
            }
        }
        builder.build().context("Failed to build exclude glob set")
    }

    fn walk_builder(&self) -> WalkBuilder {
        let mut builder = WalkBuilder::new(&self.root_path);
        builder
            .standard_filters(false)
            .follow_links(false)
            // Hidden directories are never descended into.
            .filter_entry(|entry| {
                let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
                let hidden = entry.depth() > 0
                    && entry.file_name().to_str().is_some_and(|name| name.starts_with('.'));
                !(is_dir && hidden)
            });
        builder
    }

    fn exclusion_for(&self, globset: &GlobSet, path: &Path) -> Option<Exclusion> {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if self.excluded_names.iter().any(|excluded| excluded == name) {
            return Some(Exclusion::Name);
        }
        if name.starts_with('.') {
            return Some(Exclusion::Hidden);
        }
        let rel_to_root = relative_to(path, &self.root_path)
            .unwrap_or_else(|| normalize_path(&path.to_string_lossy()));
        // Anchor root-relative paths so `**/dir/**` also matches a top-level `dir/`.
        if globset.is_match(&rel_to_root) || globset.is_match(format!("/{rel_to_root}")) {
            return Some(Exclusion::Glob);
        }
        None
    }

    fn to_scanned(&self, path: &Path) -> ScannedFile {
        let relative_path = relative_to(path, &self.relative_base)
            .unwrap_or_else(|| normalize_path(&path.to_string_lossy()));
        ScannedFile { path: path.to_path_buf(), relative_path }
    }

    /// Classify one walk entry. Directories yield `None`.
    ///
    /// Links are not descended into, but a link whose target is a regular
    /// file counts as a file leaf at the link's own path.
    fn visit(&self, globset: &GlobSet, entry: Result<DirEntry, ignore::Error>) -> Option<Visit> {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!("Skipping unreadable entry under {}: {}", self.root_path.display(), err);
                return Some(Visit::WalkError);
            }
        };

        let file_type = entry.file_type()?;
        if file_type.is_symlink() {
            match std::fs::metadata(entry.path()) {
                Ok(target) if target.is_file() => {}
                Ok(_) => {
                    tracing::debug!("Not following directory link {}", entry.path().display());
                    return Some(Visit::LinkSkipped);
                }
                Err(err) => {
                    tracing::warn!("Skipping broken link {}: {}", entry.path().display(), err);
                    return Some(Visit::LinkSkipped);
                }
            }
        } else if !file_type.is_file() {
            return None;
        }

        Some(match self.exclusion_for(globset, entry.path()) {
            Some(exclusion) => Visit::Excluded(exclusion),
            None => Visit::File(self.to_scanned(entry.path())),
        })
    }

    /// Lazily yield every non-excluded file leaf under the root.
    ///
    /// Order follows the filesystem and must not be relied upon.
    pub fn files(&self) -> Result<impl Iterator<Item = ScannedFile> + '_> {
        let globset = self.build_exclude_globset()?;
        let walker = self.walk_builder().build();
        Ok(walker.filter_map(move |entry| match self.visit(&globset, entry)? {
            Visit::File(file) => Some(file),
            _ => None,
        }))
    }

    /// Scan the root and return every included file, sorted by relative path.
    ///
    /// A missing root yields an empty list with a warning.
    pub fn scan(&mut self) -> Result<Vec<ScannedFile>> {
        self.stats = ScanStats::default();

        if !self.root_path.is_dir() {
            tracing::warn!("Content root not found at {}", self.root_path.display());
            return Ok(Vec::new());
        }

        let globset = self.build_exclude_globset()?;
        let mut stats = ScanStats::default();
        let mut files = Vec::new();

        for entry in self.walk_builder().build() {
            let Some(visit) = self.visit(&globset, entry) else {
                continue;
            };
            match visit {
                Visit::WalkError => stats.walk_errors += 1,
                Visit::LinkSkipped => stats.links_skipped += 1,
                Visit::Excluded(exclusion) => {
                    stats.files_scanned += 1;
                    match exclusion {
                        Exclusion::Name => stats.files_skipped_name += 1,
                        Exclusion::Hidden => stats.files_skipped_hidden += 1,
                        Exclusion::Glob => stats.files_skipped_glob += 1,
                    }
                }
                Visit::File(file) => {
                    stats.files_scanned += 1;
                    stats.files_included += 1;
                    files.push(file);
                }
            }
        }

        self.stats = stats;
        files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        Ok(files)
    }

    /// Get scanning statistics
    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }
}
