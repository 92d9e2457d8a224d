//! Index store client
//!
//! The search engine is an external collaborator treated as an opaque
//! key-value document store with query and commit operations. [`IndexStore`]
//! is the seam: the production implementation speaks the Solr-style HTTP
//! protocol ([`SolrClient`]); tests run against the dashmap-backed
//! [`InMemoryStore`] with fault injection.

mod client;
mod memory;
mod solr;

pub use client::{FacetCount, FilterOp, IndexStore, QueryRequest, QueryResponse};
pub use memory::InMemoryStore;
pub use solr::SolrClient;
