//! content-registry: change detection and registry compilation for curated
//! AI-assistant content trees.
//!
//! The pipeline runs in three independent, idempotent phases:
//! 1. `scan` fingerprints every content file and diffs it against the prior
//!    registry, producing a worklist of new or changed paths.
//! 2. `normalize` fills missing frontmatter fields for each worklist item and
//!    rewrites only the files whose header actually changed.
//! 3. `compile` rebuilds the full registry from the current tree, as JSON or
//!    as a SQLite table.

pub mod cli;
pub mod config;
pub mod diff;
pub mod domain;
pub mod error;
pub mod metadata;
pub mod pipeline;
pub mod registry;
pub mod scan;
pub mod sync;
pub mod utils;
