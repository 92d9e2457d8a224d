//! Catalog Indexer
//!
//! Synthesizes denormalized search documents from bibliographic catalog
//! records (authors, works, editions) and commits them to a Solr-style
//! index in durable batches.
//!
//! The flow: each incoming record is classified by its key prefix, folded
//! into an in-memory aggregate (edition fields merge into their parent
//! work's document), enriched with cross-entity data from the index
//! (author names on works, work statistics on authors), and finally
//! upserted through a batching commit driver that isolates poisoned
//! documents instead of failing the whole batch.

pub mod build;
pub mod classify;
pub mod commit;
pub mod config;
pub mod error;
pub mod fields;
pub mod models;
pub mod pipeline;
pub mod store;

pub use error::{AppError, Result};
