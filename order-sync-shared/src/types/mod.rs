//! This module defines the core data structures used across the order sync pipeline.
//! It re-exports the record, document and cursor types.

pub mod cursor;
pub mod index_document;
pub mod source_record;

pub use cursor::{OffsetCursor, SearchAfterCursor};
pub use index_document::IndexDocument;
pub use source_record::SourceRecord;
