//! Batched, partial-failure-tolerant commit protocol
//!
//! Documents accumulate into fixed-size batches submitted with a
//! commit-within durability hint. A batch the store rejects is not lost:
//! the driver re-submits each member individually so the poisoned document
//! can be identified, logged with its key, and skipped while the rest
//! succeed.

mod driver;

pub use driver::{BatchCommitDriver, CommitSummary};
