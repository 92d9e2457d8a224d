use crate::error::Result;
use crate::models::Document;
use async_trait::async_trait;
use std::collections::HashMap;

/// How multiple filter terms combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterOp {
    #[default]
    And,
    Or,
}

/// A store query: field/value filter terms, requested fields, optional
/// facet counting, sort and row limit.
#[derive(Debug, Clone, Default)]
pub struct QueryRequest {
    /// Filter terms matched against document fields
    pub filter: Vec<(String, String)>,
    /// How the filter terms combine
    pub op: FilterOp,
    /// Fields to return per document (empty = all)
    pub fields: Vec<String>,
    /// Facet fields to count
    pub facets: Vec<String>,
    /// Minimum count for a facet value to be reported
    pub facet_mincount: Option<u32>,
    /// Sort clause, e.g. `edition_count desc`
    pub sort: Option<String>,
    /// Maximum number of documents to return
    pub rows: Option<usize>,
}

impl QueryRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filter.push((field.into(), value.into()));
        self
    }

    pub fn op(mut self, op: FilterOp) -> Self {
        self.op = op;
        self
    }

    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn facets(mut self, facets: &[&str]) -> Self {
        self.facets = facets.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn facet_mincount(mut self, mincount: u32) -> Self {
        self.facet_mincount = Some(mincount);
        self
    }

    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn rows(mut self, rows: usize) -> Self {
        self.rows = Some(rows);
        self
    }
}

/// One facet value with its count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetCount {
    pub value: String,
    pub count: u64,
}

/// Result of a store query.
#[derive(Debug, Clone, Default)]
pub struct QueryResponse {
    /// Total matches, before the row limit
    pub num_found: u64,
    pub docs: Vec<Document>,
    /// Facet field name to counted values
    pub facets: HashMap<String, Vec<FacetCount>>,
}

/// Abstract document store the indexer writes to and queries.
///
/// `bulk_upsert` may fail the whole batch atomically from the caller's
/// perspective; the commit driver implements the split-retry on top of it.
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Fetch a single document by its `key` field.
    async fn get_document(&self, key: &str) -> Result<Option<Document>>;

    /// Execute a query.
    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse>;

    /// Upsert a single document.
    async fn upsert_document(&self, doc: Document) -> Result<()>;

    /// Best-effort bulk upsert with a durability deadline hint.
    async fn bulk_upsert(&self, docs: &[Document], commit_within_ms: u64) -> Result<()>;

    /// Force durability of pending writes.
    async fn commit(&self) -> Result<()>;

    /// Release any held session. Must be called on every exit path.
    async fn disconnect(&self) -> Result<()>;
}
