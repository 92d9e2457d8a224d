use crate::error::{AppError, Result};
use crate::models::Document;
use crate::store::client::{FacetCount, FilterOp, IndexStore, QueryRequest, QueryResponse};
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// In-memory document store for tests and local runs.
///
/// Supports the filter/sort/facet subset the pipeline actually issues, plus
/// fault injection: documents whose key is in the reject set poison any
/// batch containing them, which is how the commit driver's split-retry is
/// exercised.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    docs: Arc<DashMap<String, Document>>,
    reject_keys: Arc<DashSet<String>>,
    commits: Arc<AtomicU64>,
    disconnects: Arc<AtomicU64>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a document key as rejected by the store.
    pub fn reject_key(&self, key: impl Into<String>) {
        self.reject_keys.insert(key.into());
    }

    /// Number of explicit commits issued.
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }

    /// Number of disconnect calls issued.
    pub fn disconnect_count(&self) -> u64 {
        self.disconnects.load(Ordering::SeqCst)
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    fn doc_key(doc: &Document) -> Result<String> {
        doc.get("key")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AppError::Validation("document has no key field".to_string()))
    }

    /// Does `doc.field` equal (or, for list fields, contain) `value`?
    fn field_matches(doc: &Document, field: &str, value: &str) -> bool {
        match doc.get(field) {
            Some(Value::String(s)) => s == value,
            Some(Value::Array(items)) => items.iter().any(|v| v.as_str() == Some(value)),
            Some(Value::Number(n)) => n.to_string() == value,
            _ => false,
        }
    }

    fn matches(doc: &Document, request: &QueryRequest) -> bool {
        if request.filter.is_empty() {
            return true;
        }
        match request.op {
            FilterOp::And => request
                .filter
                .iter()
                .all(|(f, v)| Self::field_matches(doc, f, v)),
            FilterOp::Or => request
                .filter
                .iter()
                .any(|(f, v)| Self::field_matches(doc, f, v)),
        }
    }

    fn sort_value(doc: &Document, field: &str) -> i64 {
        doc.get(field).and_then(Value::as_i64).unwrap_or(0)
    }
}

#[async_trait]
impl IndexStore for InMemoryStore {
    async fn get_document(&self, key: &str) -> Result<Option<Document>> {
        Ok(self.docs.get(key).map(|entry| entry.clone()))
    }

    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse> {
        let mut matched: Vec<Document> = self
            .docs
            .iter()
            .filter(|entry| Self::matches(entry.value(), request))
            .map(|entry| entry.value().clone())
            .collect();

        if let Some(ref sort) = request.sort {
            let mut parts = sort.split_whitespace();
            let field = parts.next().unwrap_or_default().to_string();
            let descending = parts.next() == Some("desc");
            matched.sort_by_key(|doc| {
                let v = Self::sort_value(doc, &field);
                if descending {
                    -v
                } else {
                    v
                }
            });
        }

        let num_found = matched.len() as u64;

        // Facet counts are computed over all matches, before the row limit
        let mut facets = HashMap::new();
        for facet_field in &request.facets {
            let mut counts: HashMap<String, u64> = HashMap::new();
            for doc in &matched {
                match doc.get(facet_field) {
                    Some(Value::Array(items)) => {
                        for item in items {
                            if let Some(s) = item.as_str() {
                                *counts.entry(s.to_string()).or_default() += 1;
                            }
                        }
                    }
                    Some(Value::String(s)) => {
                        *counts.entry(s.clone()).or_default() += 1;
                    }
                    _ => {}
                }
            }
            let mincount = u64::from(request.facet_mincount.unwrap_or(0));
            let mut counted: Vec<FacetCount> = counts
                .into_iter()
                .filter(|(_, count)| *count >= mincount)
                .map(|(value, count)| FacetCount { value, count })
                .collect();
            counted.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
            facets.insert(facet_field.clone(), counted);
        }

        if let Some(rows) = request.rows {
            matched.truncate(rows);
        }
        if !request.fields.is_empty() {
            for doc in &mut matched {
                doc.retain(|k, _| request.fields.iter().any(|f| f == k) || k == "key");
            }
        }

        Ok(QueryResponse {
            num_found,
            docs: matched,
            facets,
        })
    }

    async fn upsert_document(&self, doc: Document) -> Result<()> {
        let key = Self::doc_key(&doc)?;
        if self.reject_keys.contains(&key) {
            return Err(AppError::Validation(format!("rejected document: {key}")));
        }
        self.docs.insert(key, doc);
        Ok(())
    }

    async fn bulk_upsert(&self, docs: &[Document], _commit_within_ms: u64) -> Result<()> {
        // The whole batch fails atomically when any member is rejected,
        // matching the caller-visible behavior of the real store.
        for doc in docs {
            let key = Self::doc_key(doc)?;
            if self.reject_keys.contains(&key) {
                return Err(AppError::Validation(format!("rejected document: {key}")));
            }
        }
        for doc in docs {
            let key = Self::doc_key(doc)?;
            self.docs.insert(key, doc.clone());
        }
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let store = InMemoryStore::new();
        store
            .upsert_document(doc(json!({"key": "/works/OL1W", "title": "T"})))
            .await
            .unwrap();

        let fetched = store.get_document("/works/OL1W").await.unwrap().unwrap();
        assert_eq!(fetched.get("title"), Some(&json!("T")));
        assert!(store.get_document("/works/OL9W").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_bulk_upsert_rejects_whole_batch() {
        let store = InMemoryStore::new();
        store.reject_key("/works/BAD");
        let batch = vec![
            doc(json!({"key": "/works/OL1W"})),
            doc(json!({"key": "/works/BAD"})),
        ];
        let err = store.bulk_upsert(&batch, 1000).await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_query_filters_sorts_and_facets() {
        let store = InMemoryStore::new();
        for (key, count, subjects) in [
            ("/works/OL1W", 3, vec!["Fiction"]),
            ("/works/OL2W", 9, vec!["Fiction", "History"]),
            ("/works/OL3W", 1, vec!["History"]),
        ] {
            store
                .upsert_document(doc(json!({
                    "key": key,
                    "author_key": ["/authors/OL1A"],
                    "edition_count": count,
                    "subject_facet": subjects,
                })))
                .await
                .unwrap();
        }

        let request = QueryRequest::new()
            .filter("author_key", "/authors/OL1A")
            .facets(&["subject_facet"])
            .facet_mincount(2)
            .sort("edition_count desc")
            .rows(1);
        let response = store.query(&request).await.unwrap();

        assert_eq!(response.num_found, 3);
        assert_eq!(response.docs.len(), 1);
        assert_eq!(response.docs[0].get("key"), Some(&json!("/works/OL2W")));
        let facets = &response.facets["subject_facet"];
        assert_eq!(facets.len(), 2);
        assert_eq!(facets[0].value, "Fiction");
        assert_eq!(facets[0].count, 2);
    }
}
