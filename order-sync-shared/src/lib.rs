//! # Order Sync Shared
//!
//! This crate defines the data structures shared across the order sync pipeline:
//! records read from the primary datastore, the documents written to the search
//! index, the text normalization used to build searchable fields, and the cursors
//! used to page through both stores.

pub mod text;
pub mod types;

pub use text::normalize_text;
pub use types::cursor::{OffsetCursor, SearchAfterCursor};
pub use types::index_document::IndexDocument;
pub use types::source_record::SourceRecord;
