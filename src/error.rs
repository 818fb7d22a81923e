//! Per-item failure taxonomy.
//!
//! Phase-level operations return `anyhow::Result`; a single file's failure is
//! an `ItemError`, recorded in the phase's `RunSummary` so the remaining files
//! still get processed.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemError {
    #[error("unreadable: {0}")]
    Unreadable(String),

    #[error("not found on disk")]
    Missing,

    #[error("path matches no known category")]
    Unclassified,

    #[error("malformed header block: {0}")]
    MalformedHeader(String),

    #[error("failed to write normalized header: {0}")]
    Write(String),

    #[error("item name also derived from {0}")]
    DuplicateName(String),
}

impl ItemError {
    pub fn unreadable(err: &std::io::Error) -> Self {
        ItemError::Unreadable(err.to_string())
    }
}
