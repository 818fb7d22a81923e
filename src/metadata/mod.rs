//! Header extraction and normalization.
//!
//! `extract_metadata` is the read-only path used by registry compilation.
//! `normalize_file` fills missing required fields and is the only place in the
//! crate that rewrites content files; it does so only when the header
//! actually changes, so running it again on a normalized file is a no-op.

use crate::error::ItemError;
use crate::utils::encoding::read_text;
use crate::utils::{decode_text, write_atomic};
use chrono::{DateTime, Utc};
use serde_yaml::{Mapping, Value};
use std::path::Path;

pub mod header;
pub mod record;

pub use header::{parse_header, render_document, split_document, SplitDocument};
pub use record::{DefaultContext, MetadataRecord, REQUIRED_KEYS};

/// Parsed header of one file.
#[derive(Debug, Clone)]
pub struct Extracted {
    /// Header as written in the file, in original key order.
    pub header: Mapping,
    /// Typed view with list fields split and absent fields defaulted.
    pub record: MetadataRecord,
    /// Why the header was ignored, when it was.
    pub header_issue: Option<ItemError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizeOutcome {
    Unchanged,
    Updated { filled: Vec<&'static str> },
}

/// Header mapping of a file plus the pieces needed to write it back.
struct LoadedHeader<'a> {
    split: SplitDocument<'a>,
    mapping: Mapping,
    issue: Option<ItemError>,
}

fn load_header(bytes: &[u8]) -> Result<LoadedHeader<'_>, ItemError> {
    let split = split_document(bytes);

    if split.unterminated {
        return Ok(LoadedHeader {
            split,
            mapping: Mapping::new(),
            issue: Some(ItemError::MalformedHeader("missing closing marker".to_string())),
        });
    }

    let Some(header_bytes) = split.header else {
        return Ok(LoadedHeader { split, mapping: Mapping::new(), issue: None });
    };

    let header_text = decode_text(header_bytes).text;
    match parse_header(&header_text) {
        Ok(mapping) => Ok(LoadedHeader { split, mapping, issue: None }),
        Err(reason) => {
            // Treat the whole file as body; the broken block is preserved verbatim.
            let body_only = SplitDocument {
                bom: split.bom,
                header: None,
                body: &bytes[split.bom.len()..],
                unterminated: false,
            };
            Ok(LoadedHeader {
                split: body_only,
                mapping: Mapping::new(),
                issue: Some(ItemError::MalformedHeader(reason)),
            })
        }
    }
}

/// Read a file's header without modifying the file.
pub fn extract_metadata(path: &Path, ctx: &DefaultContext) -> Result<Extracted, ItemError> {
    let (bytes, _decoded) = read_text(path)?;
    let loaded = load_header(&bytes)?;
    if let Some(issue) = &loaded.issue {
        tracing::debug!("Ignoring header of {}: {}", path.display(), issue);
    }
    let record = MetadataRecord::from_mapping(&loaded.mapping, ctx);
    Ok(Extracted { header: loaded.mapping, record, header_issue: loaded.issue })
}

/// Split comma-separated list fields in place. Returns the keys that changed.
pub fn normalize_list_fields(mapping: &mut Mapping) -> Vec<&'static str> {
    let mut changed = Vec::new();
    for key in record::LIST_KEYS {
        let Some(value) = mapping.get_mut(key) else {
            continue;
        };
        let replacement = match value {
            Value::String(s) => Some(record::split_list(s)),
            Value::Null => Some(Vec::new()),
            _ => None,
        };
        if let Some(items) = replacement {
            *value = Value::Sequence(items.into_iter().map(Value::from).collect());
            changed.push(key);
        }
    }
    changed
}

/// Append defaults for every required key absent from `mapping`.
///
/// Existing keys keep their position and value; filled keys are appended in
/// `REQUIRED_KEYS` order. Returns the keys that were filled.
pub fn fill_defaults(mapping: &mut Mapping, ctx: &DefaultContext) -> Vec<&'static str> {
    let mut filled = Vec::new();
    for key in REQUIRED_KEYS {
        if mapping.contains_key(key) {
            continue;
        }
        if let Some(value) = ctx.default_value(key) {
            mapping.insert(Value::from(key), value);
            filled.push(key);
        }
    }
    filled
}

/// Normalize one file's header, rewriting the file only if something changed.
pub fn normalize_file(
    path: &Path,
    author: &str,
    now: DateTime<Utc>,
) -> Result<NormalizeOutcome, ItemError> {
    let (bytes, _decoded) = read_text(path)?;
    let mut loaded = load_header(&bytes)?;
    if let Some(issue) = &loaded.issue {
        tracing::warn!("Error loading header from {}: {}; writing a fresh one", path.display(), issue);
    }

    let ctx = DefaultContext::for_path(path, author, now);
    let mut changed = normalize_list_fields(&mut loaded.mapping);
    let filled = fill_defaults(&mut loaded.mapping, &ctx);
    changed.extend(filled.iter().copied());

    if changed.is_empty() {
        tracing::debug!("No updates needed for {}", path.display());
        return Ok(NormalizeOutcome::Unchanged);
    }

    let rendered = render_document(loaded.split.bom, &loaded.mapping, loaded.split.body)
        .map_err(|e| ItemError::Write(e.to_string()))?;
    write_atomic(path, &rendered).map_err(|e| ItemError::Write(e.to_string()))?;
    tracing::info!("Updated header for {} ({})", path.display(), changed.join(", "));
    Ok(NormalizeOutcome::Updated { filled: changed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::TempDir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap()
    }

    #[test]
    fn test_default_fill_example() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("foo.md");
        fs::write(&path, "---\ntitle: Foo\n---\n# Foo\n").unwrap();

        let outcome = normalize_file(&path, "AI-LEY", now()).unwrap();
        let NormalizeOutcome::Updated { filled } = outcome else {
            panic!("expected the header to be updated");
        };
        assert_eq!(filled.len(), REQUIRED_KEYS.len() - 1);
        assert!(!filled.contains(&"title"));

        let bytes = fs::read(&path).unwrap();
        let split = split_document(&bytes);
        assert_eq!(split.body, b"# Foo\n");
        let mapping = parse_header(std::str::from_utf8(split.header.unwrap()).unwrap()).unwrap();
        assert_eq!(mapping.get("title").and_then(Value::as_str), Some("Foo"));
        assert_eq!(mapping.get("applyTo").and_then(Value::as_str), Some("general"));
        assert_eq!(mapping.get("version").and_then(Value::as_str), Some("1.0.0"));
        assert_eq!(mapping.get("summaryScore").and_then(Value::as_f64), Some(3.0));
        assert_eq!(mapping.get("keywords"), Some(&Value::Sequence(Vec::new())));
        assert_eq!(mapping.get("author").and_then(Value::as_str), Some("AI-LEY"));
        assert_eq!(mapping.get("lastUpdated").and_then(Value::as_str), Some("2026-03-04T05:06:07Z"));
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("react-developer.md");
        fs::write(&path, "---\ntitle: Foo\nkeywords: a, b\ncustom: kept\n---\nBody text\n").unwrap();

        normalize_file(&path, "AI-LEY", now()).unwrap();
        let first = fs::read(&path).unwrap();

        let later = Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap();
        let outcome = normalize_file(&path, "someone-else", later).unwrap();
        assert_eq!(outcome, NormalizeOutcome::Unchanged);
        assert_eq!(fs::read(&path).unwrap(), first);
    }

    #[test]
    fn test_fully_populated_file_is_never_rewritten() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("done.md");
        let content = "---\napplyTo: general\nagentMode: general\ninstructionType: general\n\
guidelines: N/A\ntitle: Done\ndescription: d\nversion: 1.0.0\nauthor: me\n\
lastUpdated: '2024-01-01'\nkeywords: []\nextensions: [.md]\nsummaryScore: 4.0\n---\nbody";
        fs::write(&path, content).unwrap();

        assert_eq!(normalize_file(&path, "AI-LEY", now()).unwrap(), NormalizeOutcome::Unchanged);
        assert_eq!(fs::read_to_string(&path).unwrap(), content);
    }

    #[test]
    fn test_missing_header_gets_one_and_keeps_body() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("api-guide.md");
        let body = b"# API guide\n\nSome text \xe9\n";
        fs::write(&path, body).unwrap();

        normalize_file(&path, "AI-LEY", now()).unwrap();
        let bytes = fs::read(&path).unwrap();
        let split = split_document(&bytes);
        assert_eq!(split.body, body);
        let mapping = parse_header(std::str::from_utf8(split.header.unwrap()).unwrap()).unwrap();
        assert_eq!(mapping.get("title").and_then(Value::as_str), Some("Api Guide"));
    }

    #[test]
    fn test_comma_separated_keywords_become_list() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("k.md");
        fs::write(&path, "---\nkeywords: 'rust,  cli , '\n---\n").unwrap();

        normalize_file(&path, "AI-LEY", now()).unwrap();
        let bytes = fs::read(&path).unwrap();
        let split = split_document(&bytes);
        let mapping = parse_header(std::str::from_utf8(split.header.unwrap()).unwrap()).unwrap();
        assert_eq!(
            mapping.get("keywords"),
            Some(&Value::Sequence(vec![Value::from("rust"), Value::from("cli")]))
        );
    }

    #[test]
    fn test_malformed_header_is_treated_as_body() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.md");
        fs::write(&path, "---\ntitle: [unclosed\n---\nbody\n").unwrap();

        let ctx = DefaultContext::for_path(&path, "AI-LEY", now());
        let extracted = extract_metadata(&path, &ctx).unwrap();
        assert!(extracted.header.is_empty());
        assert!(matches!(extracted.header_issue, Some(ItemError::MalformedHeader(_))));
        assert_eq!(extracted.record.title, "Broken");
    }

    #[test]
    fn test_extract_never_writes() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("x.md");
        fs::write(&path, "no header").unwrap();

        let ctx = DefaultContext::for_path(&path, "AI-LEY", now());
        let extracted = extract_metadata(&path, &ctx).unwrap();
        assert_eq!(extracted.record.description, "Awaiting summary.");
        assert_eq!(fs::read_to_string(&path).unwrap(), "no header");
    }

    #[test]
    fn test_unreadable_file_is_an_item_error() {
        let tmp = TempDir::new().unwrap();
        let err = normalize_file(&tmp.path().join("gone.md"), "AI-LEY", now()).unwrap_err();
        assert!(matches!(err, ItemError::Unreadable(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_file_is_normalized_in_place() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("shared-source.md");
        let link = tmp.path().join("team-guide.md");
        fs::write(&target, "# Guide\n").unwrap();
        std::os::unix::fs::symlink(&target, &link).unwrap();

        normalize_file(&link, "AI-LEY", now()).unwrap();

        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        let bytes = fs::read(&target).unwrap();
        let split = split_document(&bytes);
        assert_eq!(split.body, b"# Guide\n");
        let mapping = parse_header(std::str::from_utf8(split.header.unwrap()).unwrap()).unwrap();
        assert_eq!(mapping.get("title").and_then(Value::as_str), Some("Team Guide"));
    }
}
