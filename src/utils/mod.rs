//! Shared helpers: fingerprinting, text decoding, path handling, classification.

pub mod classify;
pub mod encoding;
pub mod hashing;
pub mod paths;

pub use classify::{classify_path, item_name};
pub use encoding::{decode_text, DecodedText};
pub use hashing::{fingerprint_file, Fingerprint};
pub use paths::{normalize_path, relative_to, write_atomic};
