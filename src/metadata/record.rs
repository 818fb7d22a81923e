//! Typed view over a header mapping.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use serde_yaml::{Mapping, Value as YamlValue};
use std::path::Path;

/// Required header keys, in the order they are appended when filled.
pub const REQUIRED_KEYS: [&str; 12] = [
    "applyTo",
    "agentMode",
    "instructionType",
    "guidelines",
    "title",
    "description",
    "version",
    "author",
    "lastUpdated",
    "keywords",
    "extensions",
    "summaryScore",
];

/// Keys added by registry compilation, never read back as header fields.
pub const COMPUTED_KEYS: [&str; 2] = ["path", "md5sum"];

/// Keys whose comma-separated string form is split into a list.
pub const LIST_KEYS: [&str; 2] = ["keywords", "extensions"];

pub const DEFAULT_SUMMARY_SCORE: f64 = 3.0;

/// Context needed to compute the defaults that depend on the file or the clock.
#[derive(Debug, Clone)]
pub struct DefaultContext {
    pub title: String,
    pub author: String,
    pub now: DateTime<Utc>,
}

impl DefaultContext {
    pub fn for_path(path: &Path, author: &str, now: DateTime<Utc>) -> Self {
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
        Self { title: title_from_stem(stem), author: author.to_string(), now }
    }

    pub fn timestamp(&self) -> String {
        self.now.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// Default header value for a required key.
    pub fn default_value(&self, key: &str) -> Option<YamlValue> {
        let value = match key {
            "applyTo" | "agentMode" | "instructionType" => YamlValue::from("general"),
            "guidelines" => YamlValue::from("N/A"),
            "title" => YamlValue::from(self.title.clone()),
            "description" => YamlValue::from("Awaiting summary."),
            "version" => YamlValue::from("1.0.0"),
            "author" => YamlValue::from(self.author.clone()),
            "lastUpdated" => YamlValue::from(self.timestamp()),
            "keywords" => YamlValue::Sequence(Vec::new()),
            "extensions" => YamlValue::Sequence(vec![YamlValue::from(".md")]),
            "summaryScore" => YamlValue::from(DEFAULT_SUMMARY_SCORE),
            _ => return None,
        };
        Some(value)
    }
}

/// Hyphens become spaces, then every word is title-cased.
///
/// A letter is upper-cased when it does not follow another letter and
/// lower-cased otherwise: `react-developer` -> `React Developer`.
pub fn title_from_stem(stem: &str) -> String {
    let mut out = String::with_capacity(stem.len());
    let mut prev_alpha = false;
    for ch in stem.replace('-', " ").chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}

/// Normalized metadata for one content item.
///
/// Unknown header keys are kept in `extra` so they survive a round trip
/// through either registry encoding.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRecord {
    pub apply_to: Vec<String>,
    pub agent_mode: String,
    pub instruction_type: String,
    pub guidelines: String,
    pub title: String,
    pub description: String,
    pub version: String,
    pub author: String,
    pub last_updated: String,
    pub keywords: Vec<String>,
    pub extensions: Vec<String>,
    pub summary_score: f64,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl MetadataRecord {
    /// Build a record from a header mapping, filling absent fields in memory.
    pub fn from_mapping(mapping: &Mapping, ctx: &DefaultContext) -> Self {
        Self::from_json_map(&yaml_mapping_to_json(mapping), ctx)
    }

    /// Build a record from a JSON object (a registry entry or a converted header).
    pub fn from_json_map(map: &Map<String, JsonValue>, ctx: &DefaultContext) -> Self {
        let text = |key: &str, default: &str| -> String {
            map.get(key).and_then(json_to_text).unwrap_or_else(|| default.to_string())
        };

        let extra = map
            .iter()
            .filter(|(key, _)| {
                !REQUIRED_KEYS.contains(&key.as_str()) && !COMPUTED_KEYS.contains(&key.as_str())
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Self {
            apply_to: map
                .get("applyTo")
                .map(|v| json_to_list(v, false))
                .unwrap_or_else(|| vec!["general".to_string()]),
            agent_mode: text("agentMode", "general"),
            instruction_type: text("instructionType", "general"),
            guidelines: text("guidelines", "N/A"),
            title: text("title", &ctx.title),
            description: text("description", "Awaiting summary."),
            version: text("version", "1.0.0"),
            author: text("author", &ctx.author),
            last_updated: text("lastUpdated", &ctx.timestamp()),
            keywords: map.get("keywords").map(|v| json_to_list(v, true)).unwrap_or_default(),
            extensions: map
                .get("extensions")
                .map(|v| json_to_list(v, true))
                .unwrap_or_else(|| vec![".md".to_string()]),
            summary_score: map
                .get("summaryScore")
                .and_then(json_to_f64)
                .unwrap_or(DEFAULT_SUMMARY_SCORE),
            extra,
        }
    }
}

/// Split a comma-separated string into trimmed, non-empty items.
pub fn split_list(value: &str) -> Vec<String> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

fn json_to_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Bool(b) => Some(b.to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Array(items) => {
            Some(items.iter().filter_map(json_to_text).collect::<Vec<_>>().join(", "))
        }
        JsonValue::Object(_) => Some(value.to_string()),
    }
}

fn json_to_list(value: &JsonValue, split_strings: bool) -> Vec<String> {
    match value {
        JsonValue::Null => Vec::new(),
        JsonValue::Array(items) => items.iter().filter_map(json_to_text).collect(),
        JsonValue::String(s) if split_strings => split_list(s),
        other => json_to_text(other).into_iter().collect(),
    }
}

fn json_to_f64(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Convert a YAML value into JSON. Non-string keys are rendered as text and
/// non-finite floats become null.
pub fn yaml_to_json(value: &YamlValue) -> JsonValue {
    match value {
        YamlValue::Null => JsonValue::Null,
        YamlValue::Bool(b) => JsonValue::Bool(*b),
        YamlValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                JsonValue::from(i)
            } else if let Some(u) = n.as_u64() {
                JsonValue::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map_or(JsonValue::Null, JsonValue::Number)
            }
        }
        YamlValue::String(s) => JsonValue::String(s.clone()),
        YamlValue::Sequence(items) => JsonValue::Array(items.iter().map(yaml_to_json).collect()),
        YamlValue::Mapping(mapping) => JsonValue::Object(yaml_mapping_to_json(mapping)),
        YamlValue::Tagged(tagged) => yaml_to_json(&tagged.value),
    }
}

pub fn yaml_mapping_to_json(mapping: &Mapping) -> Map<String, JsonValue> {
    mapping.iter().map(|(key, value)| (yaml_key_to_string(key), yaml_to_json(value))).collect()
}

fn yaml_key_to_string(key: &YamlValue) -> String {
    match key {
        YamlValue::String(s) => s.clone(),
        other => serde_yaml::to_string(other).map(|s| s.trim().to_string()).unwrap_or_default(),
    }
}
