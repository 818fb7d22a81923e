//! Worklist artifact: a newline-delimited list of base-relative paths.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub fn write_worklist(path: &Path, items: &[String]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create worklist directory {}", parent.display()))?;
    }
    let mut content = String::new();
    for item in items {
        content.push_str(item);
        content.push('\n');
    }
    fs::write(path, content)
        .with_context(|| format!("Error writing to worklist file {}", path.display()))
}

/// Read the worklist. `Ok(None)` when the file does not exist.
pub fn read_worklist(path: &Path) -> Result<Option<Vec<String>>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read worklist {}", path.display()))?;
    Ok(Some(
        content.lines().map(str::trim).filter(|line| !line.is_empty()).map(str::to_string).collect(),
    ))
}

/// Truncate the worklist to empty once it has been consumed.
pub fn clear_worklist(path: &Path) -> Result<()> {
    write_worklist(path, &[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn worklist_round_trip_and_clear() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(".project/WORKLIST.md");
        assert_eq!(read_worklist(&path).unwrap(), None);

        let items = vec!["a/personas/x.md".to_string(), "a/prompts/y.md".to_string()];
        write_worklist(&path, &items).unwrap();
        assert_eq!(read_worklist(&path).unwrap(), Some(items));

        clear_worklist(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
        assert_eq!(read_worklist(&path).unwrap(), Some(Vec::new()));
    }

    #[test]
    fn blank_lines_and_whitespace_are_ignored() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("WORKLIST.md");
        fs::write(&path, "  a.md  \n\n\r\nb.md\r\n").unwrap();
        assert_eq!(read_worklist(&path).unwrap(), Some(vec!["a.md".to_string(), "b.md".to_string()]));
    }
}
