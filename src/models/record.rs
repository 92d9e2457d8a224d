use crate::error::{AppError, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A raw catalog record: an immutable JSON object tagged by a `key` field
/// whose path prefix (`/authors/`, `/works/`, `/books/`) identifies its
/// kind. The core never mutates it.
#[derive(Debug, Clone)]
pub struct CatalogRecord {
    /// Record key, e.g. `/books/OL1M`
    pub key: String,

    raw: Value,
}

impl CatalogRecord {
    /// Wrap a decoded JSON value; fails when the `key` field is missing.
    pub fn from_json(value: Value) -> Result<Self> {
        let key = value
            .get("key")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::Validation("record has no key field".to_string()))?
            .to_string();
        Ok(Self { key, raw: value })
    }

    /// Parse one newline-delimited JSON record.
    pub fn parse(line: &str) -> Result<Self> {
        Self::from_json(serde_json::from_str(line.trim())?)
    }

    /// Decode the record into one of the typed views.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.raw.clone())?)
    }
}

/// Reference wrapper for `{"key": "..."}` objects.
#[derive(Debug, Clone, Deserialize)]
pub struct KeyRef {
    pub key: String,
}

/// A work's author entry: `{"author": {"key": "..."}}`. The inner reference
/// is optional because malformed author entries exist in the wild.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorRef {
    #[serde(default)]
    pub author: Option<KeyRef>,
}

/// A value that appears either as a plain string or as a typed
/// `{"type": ..., "value": "..."}` object (`last_modified`,
/// `first_sentence`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TextValue {
    Plain(String),
    Typed { value: String },
}

impl TextValue {
    pub fn value(&self) -> &str {
        match self {
            TextValue::Plain(s) => s,
            TextValue::Typed { value } => value,
        }
    }
}

/// A language entry: either `{"key": "/languages/eng"}` or a bare string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LanguageRef {
    Keyed { key: String },
    Plain(String),
}

impl LanguageRef {
    pub fn key(&self) -> &str {
        match self {
            LanguageRef::Keyed { key } => key,
            LanguageRef::Plain(s) => s,
        }
    }
}

/// Typed view of an author record.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorRecord {
    pub key: String,
    pub name: Option<String>,
    #[serde(default)]
    pub alternate_names: Vec<String>,
    pub birth_date: Option<String>,
    pub death_date: Option<String>,
    pub date: Option<String>,

    /// Unknown fields, preserved for forward compatibility
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Typed view of a work record.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkRecord {
    pub key: String,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    #[serde(default)]
    pub covers: Vec<i64>,
    #[serde(default)]
    pub authors: Vec<AuthorRef>,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub subject_people: Vec<String>,
    #[serde(default)]
    pub subject_places: Vec<String>,
    #[serde(default)]
    pub subject_times: Vec<String>,
    pub last_modified: Option<TextValue>,

    /// Unknown fields, preserved for forward compatibility
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Typed view of an edition record.
#[derive(Debug, Clone, Deserialize)]
pub struct EditionRecord {
    pub key: String,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub by_statement: Option<String>,
    pub publish_date: Option<String>,
    #[serde(default)]
    pub lccn: Vec<String>,
    #[serde(default)]
    pub publish_places: Vec<String>,
    #[serde(default)]
    pub oclc_numbers: Vec<String>,
    #[serde(default)]
    pub contributions: Vec<String>,
    #[serde(default)]
    pub isbn_10: Vec<String>,
    #[serde(default)]
    pub isbn_13: Vec<String>,
    pub last_modified: Option<TextValue>,

    /// Archive identifier; its presence marks a full-text ebook
    pub ocaid: Option<String>,
    #[serde(default)]
    pub ia_collection: Vec<String>,
    #[serde(default)]
    pub public_scan: bool,

    pub first_sentence: Option<TextValue>,
    #[serde(default)]
    pub publishers: Vec<String>,
    #[serde(default)]
    pub languages: Vec<LanguageRef>,

    /// Identifier namespaces (`goodreads`, `librarything`, ...) to id lists
    #[serde(default)]
    pub identifiers: BTreeMap<String, Vec<String>>,

    /// String-or-list fields with unreliable shapes; coerced (and logged)
    /// at fold time
    pub ia_loaded_id: Option<Value>,
    pub ia_box_id: Option<Value>,

    #[serde(default)]
    pub works: Vec<KeyRef>,
    #[serde(default)]
    pub covers: Vec<i64>,

    /// Unknown fields, preserved for forward compatibility
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EditionRecord {
    /// The work keys this edition names, in record order.
    pub fn work_keys(&self) -> Vec<String> {
        self.works.iter().map(|w| w.key.clone()).collect()
    }
}

/// Extract the path segment of a key: `/books/OL1M` -> `OL1M`.
pub fn short_key(key: &str) -> Option<&str> {
    key.split('/').nth(2)
}

/// Convert a `last_modified` value into an epoch-seconds integer.
///
/// Unparseable timestamps fall back to the current time, matching the
/// behavior the index has always had for dirty modification dates.
pub fn datetimestr_to_int(value: Option<&TextValue>) -> i64 {
    let Some(value) = value else {
        return Utc::now().timestamp();
    };
    let raw = value.value();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.timestamp();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return dt.and_utc().timestamp();
    }
    tracing::warn!(value = raw, "Unparseable last_modified; using current time");
    Utc::now().timestamp()
}
