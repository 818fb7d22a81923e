//! Path normalization

use std::path::Path;

pub fn normalize_path(path: &str) -> String {
    // Convert backslashes to forward slashes and normalize
    path.replace('\\', "/")
}

/// `path` relative to `base` with `/` separators, or `None` when `path` is
/// not under `base`.
pub fn relative_to(path: &Path, base: &Path) -> Option<String> {
    let rel = path.strip_prefix(base).ok()?;
    Some(normalize_path(&rel.to_string_lossy()))
}

/// Write through a sibling temp file so a crash never leaves a truncated file.
///
/// When `path` is a symlink the link's target is rewritten and the link
/// itself is kept.
pub fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let target = match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => std::fs::canonicalize(path)?,
        _ => path.to_path_buf(),
    };
    let mut tmp_name = target.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = target.with_file_name(tmp_name);
    std::fs::write(&tmp_path, contents)?;
    std::fs::rename(&tmp_path, &target).inspect_err(|_| {
        let _ = std::fs::remove_file(&tmp_path);
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_to_strips_base() {
        let rel = relative_to(Path::new("/repo/.ai-ley/shared/personas/a.md"), Path::new("/repo"));
        assert_eq!(rel.as_deref(), Some(".ai-ley/shared/personas/a.md"));
        assert!(relative_to(Path::new("/other/a.md"), Path::new("/repo")).is_none());
    }

    #[test]
    fn normalize_path_converts_backslashes() {
        assert_eq!(normalize_path(r"personas\dev\a.md"), "personas/dev/a.md");
    }

    #[test]
    fn write_atomic_replaces_contents() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("a.md");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        assert!(!tmp.path().join("a.md.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn write_atomic_keeps_symlink_and_updates_target() {
        let tmp = tempfile::TempDir::new().unwrap();
        let target = tmp.path().join("real.md");
        let link = tmp.path().join("link.md");
        std::fs::write(&target, b"old").unwrap();
        std::os::unix::fs::symlink(&target, &link).unwrap();

        write_atomic(&link, b"new").unwrap();

        assert!(std::fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(std::fs::read(&target).unwrap(), b"new");
    }
}
