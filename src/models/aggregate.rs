use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// A document in the index store's shape: a flat field-name to value map.
pub type Document = Map<String, Value>;

fn work_type() -> String {
    "work".to_string()
}

fn author_type() -> String {
    "author".to_string()
}

/// The central mutable aggregate: one denormalized search document per
/// work, folded together from the work record and every edition record
/// that names it.
///
/// Dynamic fields (the `id_<namespace>` identifier lists) and anything a
/// pre-existing indexed document carried that this schema does not know
/// about live in the flattened `extra` sidecar map, so a fetch-fold-upsert
/// cycle never loses fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkAggregate {
    /// Work key, e.g. `/works/OL1W`
    pub key: String,

    #[serde(rename = "type", default = "work_type")]
    pub doc_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,

    /// Edition titles that differ from the work's own title
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternative_title: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternative_subtitle: Vec<String>,

    /// Cover id chosen for the work
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_i: Option<i64>,
    /// Short key of the edition whose cover represents the work
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_edition_key: Option<String>,

    /// Max of the work's own and every folded edition's modification time
    #[serde(default)]
    pub last_modified_i: i64,

    /// Number of editions folded into this aggregate
    #[serde(default)]
    pub edition_count: u32,
    #[serde(default)]
    pub ebook_count_i: u32,
    // The flags always serialize: the work document carries them even
    // when false.
    #[serde(default)]
    pub has_fulltext: bool,
    #[serde(default)]
    pub public_scan_b: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub author_key: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub author_name: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub author_alternative_name: Vec<String>,
    /// `"<key> <name>"` pairs for author faceting
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub author_facet: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub by_statement: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub publish_date: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub publish_year: Vec<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_publish_year: Option<i32>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lccn: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub publish_place: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub oclc: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contributor: Vec<String>,

    /// Closed under 10<->13 counterpart expansion
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub isbns: BTreeSet<String>,

    /// Archive item identifiers of full-text editions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ia: Vec<String>,
    /// Semicolon-joined union of archive collections
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ia_collection_s: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lending_edition_s: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lending_identifier_s: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub printdisabled_s: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ia_loaded_id: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ia_box_id: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub first_sentence: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub publisher: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub language: Vec<String>,

    // Facet trios, set once from the work record at creation time
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subject: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subject_facet: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subject_key: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub person: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub person_facet: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub person_key: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub place: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub place_facet: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub place_key: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub time: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub time_facet: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub time_key: Vec<String>,

    /// Related-content discovery keys: the work's own key, prefixed facet
    /// keys, contributing author keys, and folded edition keys. Kept
    /// duplicate-free, order-insensitive.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub seed: Vec<String>,

    /// Dynamic `id_*` identifier fields and forward-compatibility sidecar
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkAggregate {
    /// An empty aggregate for the given work key. Counters and flags start
    /// at their zero values; `seed` starts with the work's own key.
    pub fn empty(key: String) -> Self {
        Self {
            seed: vec![key.clone()],
            key,
            doc_type: work_type(),
            title: None,
            subtitle: None,
            alternative_title: Vec::new(),
            alternative_subtitle: Vec::new(),
            cover_i: None,
            cover_edition_key: None,
            last_modified_i: 0,
            edition_count: 0,
            ebook_count_i: 0,
            has_fulltext: false,
            public_scan_b: false,
            author_key: Vec::new(),
            author_name: Vec::new(),
            author_alternative_name: Vec::new(),
            author_facet: Vec::new(),
            by_statement: Vec::new(),
            publish_date: Vec::new(),
            publish_year: Vec::new(),
            first_publish_year: None,
            lccn: Vec::new(),
            publish_place: Vec::new(),
            oclc: Vec::new(),
            contributor: Vec::new(),
            isbns: BTreeSet::new(),
            ia: Vec::new(),
            ia_collection_s: None,
            lending_edition_s: None,
            lending_identifier_s: None,
            printdisabled_s: None,
            ia_loaded_id: Vec::new(),
            ia_box_id: Vec::new(),
            first_sentence: Vec::new(),
            publisher: Vec::new(),
            language: Vec::new(),
            subject: Vec::new(),
            subject_facet: Vec::new(),
            subject_key: Vec::new(),
            person: Vec::new(),
            person_facet: Vec::new(),
            person_key: Vec::new(),
            place: Vec::new(),
            place_facet: Vec::new(),
            place_key: Vec::new(),
            time: Vec::new(),
            time_facet: Vec::new(),
            time_key: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Serialize to the store's document shape.
    pub fn to_document(&self) -> crate::error::Result<Document> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => Err(crate::error::AppError::Serialization(
                "work aggregate did not serialize to an object".to_string(),
            )),
        }
    }

    /// Decode a previously indexed document back into an aggregate.
    pub fn from_document(doc: Document) -> crate::error::Result<Self> {
        Ok(serde_json::from_value(Value::Object(doc))?)
    }
}

/// Denormalized author document: base fields from the author record plus
/// the work-derived enrichment fields filled in after the works are
/// committed and visible to queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorAggregate {
    /// Author key, e.g. `/authors/OL1A`
    pub key: String,

    #[serde(rename = "type", default = "author_type")]
    pub doc_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternate_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub death_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    /// Number of indexed works naming this author
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_count: Option<u64>,
    /// Title (and subtitle) of the author's most-published work
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_work: Option<String>,
    /// Up to 10 facet values, ranked by count across all facet dimensions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub top_subjects: Vec<String>,

    /// Forward-compatibility sidecar
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AuthorAggregate {
    /// Serialize to the store's document shape.
    pub fn to_document(&self) -> crate::error::Result<Document> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => Err(crate::error::AppError::Serialization(
                "author aggregate did not serialize to an object".to_string(),
            )),
        }
    }

    /// Decode a previously indexed document back into an aggregate.
    pub fn from_document(doc: Document) -> crate::error::Result<Self> {
        Ok(serde_json::from_value(Value::Object(doc))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_aggregate_seed_contains_own_key() {
        let work = WorkAggregate::empty("/works/OL1W".to_string());
        assert_eq!(work.seed, vec!["/works/OL1W".to_string()]);
        assert_eq!(work.edition_count, 0);
        assert!(!work.has_fulltext);
    }

    #[test]
    fn test_document_round_trip_preserves_sidecar() {
        let mut work = WorkAggregate::empty("/works/OL1W".to_string());
        work.extra.insert(
            "id_goodreads".to_string(),
            serde_json::json!(["12345"]),
        );

        let doc = work.to_document().unwrap();
        assert_eq!(doc.get("type"), Some(&serde_json::json!("work")));
        assert_eq!(doc.get("id_goodreads"), Some(&serde_json::json!(["12345"])));

        let back = WorkAggregate::from_document(doc).unwrap();
        assert_eq!(back.key, "/works/OL1W");
        assert!(back.extra.contains_key("id_goodreads"));
    }

    #[test]
    fn test_empty_collections_not_serialized() {
        let work = WorkAggregate::empty("/works/OL2W".to_string());
        let doc = work.to_document().unwrap();
        assert!(!doc.contains_key("publisher"));
        assert!(!doc.contains_key("isbns"));
        // Counters and flags always serialize
        assert_eq!(doc.get("has_fulltext"), Some(&serde_json::json!(false)));
        assert_eq!(doc.get("edition_count"), Some(&serde_json::json!(0)));
        assert!(doc.contains_key("seed"));
    }
}
