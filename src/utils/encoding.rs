//! Text decoding with a single permissive fallback.
//!
//! Content files are expected to be UTF-8. Files written by older editors are
//! sometimes Windows-1252/Latin-1; those are decoded with `encoding_rs` after
//! strict UTF-8 fails. Windows-1252 as implemented by `encoding_rs` maps every
//! byte to a character, so decoding never fails. Only the decoded text is used
//! for parsing, so callers that rewrite a file keep working with the original
//! bytes.

use crate::error::ItemError;
use encoding_rs::WINDOWS_1252;

const UTF8_BOM: &[u8] = &[0xef, 0xbb, 0xbf];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    /// Label of the encoding that produced `text`.
    pub encoding: &'static str,
    pub had_bom: bool,
}

impl DecodedText {
    pub fn used_fallback(&self) -> bool {
        self.encoding != "utf-8"
    }
}

/// Decode `bytes` as UTF-8 (BOM stripped), falling back to Windows-1252.
pub fn decode_text(bytes: &[u8]) -> DecodedText {
    let (had_bom, payload) = match bytes.strip_prefix(UTF8_BOM) {
        Some(rest) => (true, rest),
        None => (false, bytes),
    };

    if let Ok(text) = std::str::from_utf8(payload) {
        return DecodedText { text: text.to_string(), encoding: "utf-8", had_bom };
    }

    let (decoded, _) = WINDOWS_1252.decode_without_bom_handling(payload);
    DecodedText { text: decoded.into_owned(), encoding: "windows-1252", had_bom }
}

/// Read and decode a file, mapping I/O failures to `ItemError::Unreadable`.
pub fn read_text(path: &std::path::Path) -> Result<(Vec<u8>, DecodedText), ItemError> {
    let bytes = std::fs::read(path).map_err(|e| ItemError::unreadable(&e))?;
    let decoded = decode_text(&bytes);
    if decoded.used_fallback() {
        tracing::info!("Used '{}' encoding for {}", decoded.encoding, path.display());
    }
    Ok((bytes, decoded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_decode_utf8() {
        let decoded = decode_text("Test content 🚀".as_bytes());
        assert_eq!(decoded.text, "Test content 🚀");
        assert_eq!(decoded.encoding, "utf-8");
        assert!(!decoded.had_bom);
    }

    #[test]
    fn test_decode_strips_utf8_bom() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"Hello");
        let decoded = decode_text(&bytes);
        assert_eq!(decoded.text, "Hello");
        assert!(decoded.had_bom);
    }

    #[test]
    fn test_decode_falls_back_to_windows_1252() {
        // "café" with a Latin-1 e-acute
        let decoded = decode_text(&[b'c', b'a', b'f', 0xe9]);
        assert_eq!(decoded.text, "café");
        assert!(decoded.used_fallback());
    }

    #[test]
    fn test_decode_any_byte_sequence() {
        // Bytes undefined in ISO-8859-1 and invalid UTF-8 lead bytes still decode
        let bytes: Vec<u8> = (0u8..=255).collect();
        let decoded = decode_text(&bytes);
        assert!(decoded.used_fallback());
        assert_eq!(decoded.text.chars().count(), 256);
    }

    #[test]
    fn test_read_text_missing_file_is_unreadable() {
        let err = read_text(std::path::Path::new("/definitely/not/here.md")).unwrap_err();
        assert!(matches!(err, ItemError::Unreadable(_)));
    }

    #[test]
    fn test_read_text_keeps_raw_bytes() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[b'a', 0xe9, b'\n']).unwrap();
        file.flush().unwrap();

        let (bytes, decoded) = read_text(file.path()).unwrap();
        assert_eq!(bytes, vec![b'a', 0xe9, b'\n']);
        assert_eq!(decoded.text, "aé\n");
    }
}
