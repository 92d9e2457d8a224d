//! Record classification by key prefix
//!
//! An incoming record's key decides whether it denotes an author, a work,
//! or an edition, and whether an edition folds into existing works or must
//! synthesize a standalone one. Unrecognized prefixes are an explicit
//! error the caller logs and skips; nothing is dropped silently.

use crate::error::{AppError, Result};
use crate::models::{short_key, CatalogRecord, EditionRecord};

/// How an edition maps onto a work aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkTarget {
    /// The edition names a work that exists (or will exist) in the index
    Existing(String),
    /// The edition names no work; a synthetic work key is derived from the
    /// edition's own key
    Synthetic(String),
}

impl WorkTarget {
    pub fn key(&self) -> &str {
        match self {
            WorkTarget::Existing(key) | WorkTarget::Synthetic(key) => key,
        }
    }
}

/// Outcome of classifying one record.
#[derive(Debug, Clone)]
pub enum Classification {
    Author,
    Work,
    Edition { targets: Vec<WorkTarget> },
}

/// Classify a record by its key prefix.
///
/// Editions resolve their named work keys here; an edition with no `works`
/// entry yields a single [`WorkTarget::Synthetic`]. Unknown prefixes are an
/// [`AppError::Classification`].
pub fn classify(record: &CatalogRecord) -> Result<Classification> {
    if record.key.starts_with("/authors/") {
        return Ok(Classification::Author);
    }
    if record.key.starts_with("/works/") {
        return Ok(Classification::Work);
    }
    if record.key.starts_with("/books/") {
        let edition: EditionRecord = record.decode()?;
        let work_keys = edition.work_keys();
        let targets = if work_keys.is_empty() {
            vec![WorkTarget::Synthetic(synthetic_work_key(&record.key)?)]
        } else {
            work_keys.into_iter().map(WorkTarget::Existing).collect()
        };
        return Ok(Classification::Edition { targets });
    }
    Err(AppError::Classification(record.key.clone()))
}

/// Derive a deterministic work key for a standalone edition by
/// substituting the path segment: `/books/OL1M` -> `/works/OL1M`.
pub fn synthetic_work_key(edition_key: &str) -> Result<String> {
    let short = short_key(edition_key).ok_or_else(|| {
        AppError::FieldTransform(format!("edition key has no path segment: {edition_key}"))
    })?;
    Ok(format!("/works/{short}"))
}
