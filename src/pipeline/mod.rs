//! Pipeline orchestration
//!
//! One logical pipeline processes records in arrival order. Aggregation
//! itself is pure CPU work; only store calls block on the network, and
//! those are bounded by the store client's connection pool. Folds for a
//! given work key are applied strictly in input order because the
//! "pick one" and cover-selection policies are not commutative.
//!
//! The run is staged around two durability barriers:
//!
//! 1. author base documents are committed, so fresh work documents can
//!    denormalize author names out of the index;
//! 2. work documents are committed, so author enrichment's facet queries
//!    read the works they aggregate over.

mod processor;

pub use processor::{IndexPipeline, RunSummary};
