//! Error types for the order sync repository.
//!
//! This module provides one error type per collaborator: the search index and
//! the primary datastore.

mod search_index_error;
mod source_store_error;

pub use search_index_error::SearchIndexError;
pub use source_store_error::SourceStoreError;
