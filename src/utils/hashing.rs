//! Content fingerprints for change detection.
//!
//! MD5 is used for compatibility with previously compiled registries; the
//! digest only detects edits and carries no integrity guarantee.

use md5::{Digest, Md5};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const CHUNK_SIZE: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fingerprint {
    Digest(String),
    /// The file could not be opened or read. Never equal to a recorded digest.
    Unavailable,
}

impl Fingerprint {
    pub fn as_digest(&self) -> Option<&str> {
        match self {
            Fingerprint::Digest(hex) => Some(hex),
            Fingerprint::Unavailable => None,
        }
    }

    /// Whether this fingerprint matches a digest recorded in a prior registry.
    pub fn matches(&self, recorded: &str) -> bool {
        matches!(self, Fingerprint::Digest(hex) if hex == recorded)
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Fingerprint::Digest(_))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fingerprint::Digest(hex) => f.write_str(hex),
            Fingerprint::Unavailable => f.write_str("unavailable"),
        }
    }
}

/// Stream a file through MD5 in fixed-size chunks.
pub fn fingerprint_file(path: &Path) -> Fingerprint {
    match digest_file(path) {
        Ok(hex) => Fingerprint::Digest(hex),
        Err(err) => {
            tracing::warn!("Could not fingerprint {}: {}", path.display(), err);
            Fingerprint::Unavailable
        }
    }
}

fn digest_file(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Md5::new();
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let read = file.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

pub fn fingerprint_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Md5::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn fingerprint_is_stable_for_unchanged_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.md");
        fs::write(&path, "hello").unwrap();

        let first = fingerprint_file(&path);
        let second = fingerprint_file(&path);
        assert_eq!(first, second);
        assert_eq!(first.as_digest(), Some("5d41402abc4b2a76b9719d911017c592"));
    }

    #[test]
    fn fingerprint_changes_with_one_byte() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.md");
        fs::write(&path, "hello").unwrap();
        let before = fingerprint_file(&path);
        fs::write(&path, "hellp").unwrap();
        let after = fingerprint_file(&path);
        assert_ne!(before, after);
    }

    #[test]
    fn fingerprint_spans_multiple_chunks() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("big.md");
        let content = "x".repeat(CHUNK_SIZE * 3 + 17);
        fs::write(&path, &content).unwrap();
        assert!(fingerprint_file(&path).matches(&fingerprint_bytes(content.as_bytes())));
    }

    #[test]
    fn missing_file_is_unavailable_and_never_matches() {
        let tmp = TempDir::new().unwrap();
        let fp = fingerprint_file(&tmp.path().join("nope.md"));
        assert_eq!(fp, Fingerprint::Unavailable);
        assert!(!fp.matches(""));
        assert!(!fp.matches("unavailable"));
    }
}
