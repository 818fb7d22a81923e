//! Header block splitting and rendering.
//!
//! A header block starts with a `---` line at the very top of the file
//! (after an optional UTF-8 BOM) and ends at the next `---` line. Splitting
//! works on raw bytes so the body can be written back untouched.

use serde_yaml::{Mapping, Value};

pub const MARKER: &str = "---";

const UTF8_BOM: &[u8] = &[0xef, 0xbb, 0xbf];

/// A file split into BOM, header bytes and body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitDocument<'a> {
    pub bom: &'a [u8],
    /// Bytes between the two marker lines, `None` when there is no header.
    pub header: Option<&'a [u8]>,
    pub body: &'a [u8],
    /// Set when an opening marker was found without a closing one.
    pub unterminated: bool,
}

fn is_marker_line(line: &[u8]) -> bool {
    let trimmed = line
        .iter()
        .rposition(|b| !matches!(b, b'\r' | b' ' | b'\t'))
        .map_or(&line[..0], |end| &line[..=end]);
    trimmed == MARKER.as_bytes()
}

/// Split raw file bytes into header and body.
pub fn split_document(bytes: &[u8]) -> SplitDocument<'_> {
    let (bom, payload) = match bytes.strip_prefix(UTF8_BOM) {
        Some(rest) => (&bytes[..UTF8_BOM.len()], rest),
        None => (&bytes[..0], bytes),
    };

    let no_header = |unterminated| SplitDocument { bom, header: None, body: payload, unterminated };

    let Some(first_end) = payload.iter().position(|b| *b == b'\n') else {
        return no_header(false);
    };
    if !is_marker_line(&payload[..first_end]) {
        return no_header(false);
    }

    let header_start = first_end + 1;
    let mut line_start = header_start;
    while line_start <= payload.len() {
        let line_end =
            payload[line_start..].iter().position(|b| *b == b'\n').map(|i| line_start + i);
        let line = &payload[line_start..line_end.unwrap_or(payload.len())];
        if is_marker_line(line) {
            let body_start = line_end.map_or(payload.len(), |end| end + 1);
            return SplitDocument {
                bom,
                header: Some(&payload[header_start..line_start]),
                body: &payload[body_start..],
                unterminated: false,
            };
        }
        match line_end {
            Some(end) => line_start = end + 1,
            None => break,
        }
    }

    no_header(true)
}

/// Parse header text as an ordered key/value mapping.
///
/// An empty header yields an empty mapping; anything that is not a mapping is
/// an error.
pub fn parse_header(text: &str) -> Result<Mapping, String> {
    if text.trim().is_empty() {
        return Ok(Mapping::new());
    }
    match serde_yaml::from_str::<Value>(text) {
        Ok(Value::Mapping(mapping)) => Ok(mapping),
        Ok(Value::Null) => Ok(Mapping::new()),
        Ok(other) => Err(format!("expected key/value pairs, found {}", value_kind(&other))),
        Err(err) => Err(err.to_string()),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Render a header mapping followed by the untouched body bytes.
pub fn render_document(bom: &[u8], header: &Mapping, body: &[u8]) -> Result<Vec<u8>, serde_yaml::Error> {
    let yaml = serde_yaml::to_string(header)?;
    let mut out = Vec::with_capacity(bom.len() + yaml.len() + body.len() + 8);
    out.extend_from_slice(bom);
    out.extend_from_slice(MARKER.as_bytes());
    out.push(b'\n');
    out.extend_from_slice(yaml.as_bytes());
    if !yaml.ends_with('\n') {
        out.push(b'\n');
    }
    out.extend_from_slice(MARKER.as_bytes());
    out.push(b'\n');
    out.extend_from_slice(body);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_header_and_body() {
        let doc = split_document(b"---\ntitle: Foo\n---\n# Body\ntext\n");
        assert_eq!(doc.header, Some(&b"title: Foo\n"[..]));
        assert_eq!(doc.body, b"# Body\ntext\n");
        assert!(!doc.unterminated);
    }

    #[test]
    fn handles_crlf_markers() {
        let doc = split_document(b"---\r\ntitle: Foo\r\n---\r\nbody");
        assert_eq!(doc.header, Some(&b"title: Foo\r\n"[..]));
        assert_eq!(doc.body, b"body");
    }

    #[test]
    fn closing_marker_at_eof_without_newline() {
        let doc = split_document(b"---\ntitle: Foo\n---");
        assert_eq!(doc.header, Some(&b"title: Foo\n"[..]));
        assert!(doc.body.is_empty());
    }

    #[test]
    fn empty_header_block() {
        let doc = split_document(b"---\n---\nbody\n");
        assert_eq!(doc.header, Some(&b""[..]));
        assert_eq!(doc.body, b"body\n");
    }

    #[test]
    fn no_marker_means_whole_file_is_body() {
        let doc = split_document(b"# Title\n---\nnot a header\n");
        assert_eq!(doc.header, None);
        assert_eq!(doc.body, b"# Title\n---\nnot a header\n");
    }

    #[test]
    fn unterminated_header_is_body() {
        let doc = split_document(b"---\ntitle: Foo\nno closing marker\n");
        assert_eq!(doc.header, None);
        assert!(doc.unterminated);
        assert_eq!(doc.body, b"---\ntitle: Foo\nno closing marker\n");
    }

    #[test]
    fn bom_is_kept_separately() {
        let doc = split_document(b"\xef\xbb\xbf---\na: 1\n---\nbody");
        assert_eq!(doc.bom, UTF8_BOM);
        assert_eq!(doc.header, Some(&b"a: 1\n"[..]));
    }

    #[test]
    fn parse_header_accepts_quoted_values() {
        let mapping = parse_header("title: \"Quoted: value\"\nversion: '2.0.0'\n").unwrap();
        assert_eq!(mapping.get("title").and_then(Value::as_str), Some("Quoted: value"));
        assert_eq!(mapping.get("version").and_then(Value::as_str), Some("2.0.0"));
    }

    #[test]
    fn parse_header_rejects_non_mapping() {
        assert!(parse_header("- a\n- b\n").is_err());
        assert!(parse_header("title: [unclosed\n").is_err());
        assert!(parse_header("   \n").unwrap().is_empty());
    }

    #[test]
    fn render_preserves_body_bytes_and_key_order() {
        let mut mapping = Mapping::new();
        mapping.insert("zeta".into(), "z".into());
        mapping.insert("alpha".into(), "a".into());
        let body = b"\n# Body \xe9\r\n";
        let out = render_document(b"", &mapping, body).unwrap();

        let doc = split_document(&out);
        assert_eq!(doc.body, body);
        let header = std::str::from_utf8(doc.header.unwrap()).unwrap();
        assert!(header.find("zeta").unwrap() < header.find("alpha").unwrap());
    }
}
