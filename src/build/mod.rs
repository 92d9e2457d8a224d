//! Aggregate builders
//!
//! The work builder is the central reducer: it folds one edition record at
//! a time into a mutable [`WorkAggregate`](crate::models::WorkAggregate),
//! applying per-field merge policy, and runs the cover-selection second
//! pass over the full edition set. The author builder produces base author
//! documents and enriches them from already-indexed works.

mod author;
mod work;

pub use author::{enrich_author, AuthorBuilder};
pub use work::{inject_author_names, WorkBuilder};
