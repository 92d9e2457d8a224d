//! Data model: raw catalog records and the aggregate search documents
//!
//! Records arrive as loosely typed JSON objects tagged by a key whose path
//! prefix identifies their kind. They are decoded once at the ingestion
//! boundary into typed views with optional fields; anything the schema does
//! not know about is preserved in a generic `extra` sidecar map rather than
//! silently dropped.

mod aggregate;
mod record;

pub use aggregate::{AuthorAggregate, Document, WorkAggregate};
pub use record::{
    datetimestr_to_int, short_key, AuthorRecord, AuthorRef, CatalogRecord, EditionRecord, KeyRef,
    LanguageRef, TextValue, WorkRecord,
};
