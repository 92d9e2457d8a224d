//! Field-level transforms shared by the aggregate builders
//!
//! Everything in this module is a pure function over strings: index-field
//! name sanitization, ISBN counterpart reconciliation, and facet-key
//! slugification. Failures are expressed as `None`/empty results so callers
//! can log and skip a single field without aborting the record.

mod isbn;
mod sanitize;
mod slug;

pub use isbn::{counterpart, reconcile};
pub use sanitize::sanitize;
pub use slug::str_to_key;
