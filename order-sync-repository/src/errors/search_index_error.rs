//! Search index error types.
//!
//! This module defines the unified error type for all search index operations,
//! from transport failures to responses the backend rejected.

use thiserror::Error;

/// Unified errors from search index operations.
///
/// Used by the `SearchIndexProvider` trait for every backend call. A bulk call
/// that fails as a whole (unreachable or overloaded backend) surfaces as
/// `BulkIndexError`; items rejected inside an otherwise successful bulk call are
/// reported per item in `BatchOperationSummary` instead.
#[derive(Debug, Clone, Error)]
pub enum SearchIndexError {
    /// Validation error (e.g., empty index name, empty batch key).
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Failed to establish connection to the search index backend.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Failed to check for or create the search index.
    #[error("Index creation error: {0}")]
    IndexCreationError(String),

    /// Failed to read, close, open or update index settings.
    #[error("Settings error: {0}")]
    SettingsError(String),

    /// Failed to update index mappings.
    #[error("Mapping error: {0}")]
    MappingError(String),

    /// Bulk write failed, either as a whole or for an individual item.
    #[error("Bulk index error: {0}")]
    BulkIndexError(String),

    /// Failed to refresh the index.
    #[error("Refresh error: {0}")]
    RefreshError(String),

    /// Search request failed.
    #[error("Search error: {0}")]
    SearchError(String),

    /// Failed to parse response from search index backend.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Failed to serialize data for the search index backend.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Unknown error.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl SearchIndexError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create an index creation error.
    pub fn index_creation(msg: impl Into<String>) -> Self {
        Self::IndexCreationError(msg.into())
    }

    /// Create a settings error.
    pub fn settings(msg: impl Into<String>) -> Self {
        Self::SettingsError(msg.into())
    }

    /// Create a mapping error.
    pub fn mapping(msg: impl Into<String>) -> Self {
        Self::MappingError(msg.into())
    }

    /// Create a bulk index error.
    pub fn bulk_index(msg: impl Into<String>) -> Self {
        Self::BulkIndexError(msg.into())
    }

    /// Create a refresh error.
    pub fn refresh(msg: impl Into<String>) -> Self {
        Self::RefreshError(msg.into())
    }

    /// Create a search error.
    pub fn search(msg: impl Into<String>) -> Self {
        Self::SearchError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }

    /// Create an unknown error.
    pub fn unknown(msg: impl Into<String>) -> Self {
        Self::Unknown(msg.into())
    }
}
