//! Search index provider trait definition.
//!
//! This module defines the abstract interface for search index operations,
//! allowing for different backend implementations (OpenSearch, Elasticsearch, etc.).

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::SearchIndexError;
use crate::types::{
    BatchOperationSummary, CreateIndexOutcome, IndexSchema, SearchPage, SearchRequest,
    UpsertDocumentRequest,
};

/// Abstracts the underlying search index implementation (OpenSearch, Elasticsearch, etc.).
///
/// This trait defines the interface for all search index backend implementations.
/// Implementations are injected into the bootstrapper, bulk writer and exporter to
/// enable dependency injection and easy testing with mock implementations.
///
/// All methods take the target index name explicitly and return
/// `Result<T, SearchIndexError>` for consistent error handling across backends.
///
/// # Note on Writes
///
/// There is no separate create or update call. `bulk_write` upserts by key: a
/// document is inserted if its key is absent and overwritten if present. Writes are
/// not guaranteed to be visible to searches until `refresh` is called.
///
/// # Settings Migrations
///
/// `close_index`, `apply_settings`, `open_index` and `put_mapping` are only meant
/// to be called in that order while no writer is active against the index.
#[async_trait]
pub trait SearchIndexProvider: Send + Sync {
    /// Check whether an index exists.
    async fn index_exists(&self, index: &str) -> Result<bool, SearchIndexError>;

    /// Create an index with the given settings and mappings.
    ///
    /// # Returns
    ///
    /// * `Ok(CreateIndexOutcome::Created)` - If this call created the index
    /// * `Ok(CreateIndexOutcome::AlreadyExists)` - If the backend reports the index already exists
    /// * `Err(SearchIndexError)` - If creation fails for any other reason
    async fn create_index(
        &self,
        index: &str,
        schema: &IndexSchema,
    ) -> Result<CreateIndexOutcome, SearchIndexError>;

    /// Read the current settings of an index (the object under `settings`).
    async fn get_settings(&self, index: &str) -> Result<Value, SearchIndexError>;

    /// Close an index so that static settings (analysis) can be changed.
    async fn close_index(&self, index: &str) -> Result<(), SearchIndexError>;

    /// Apply settings to an index.
    async fn apply_settings(&self, index: &str, settings: &Value) -> Result<(), SearchIndexError>;

    /// Reopen a closed index.
    async fn open_index(&self, index: &str) -> Result<(), SearchIndexError>;

    /// Read the current mappings of an index (the object under `mappings`, including `_meta`).
    async fn get_mapping(&self, index: &str) -> Result<Value, SearchIndexError>;

    /// Add field mappings to an index.
    async fn put_mapping(&self, index: &str, mapping: &Value) -> Result<(), SearchIndexError>;

    /// Upsert a batch of documents in a single bulk call.
    ///
    /// # Arguments
    ///
    /// * `index` - Target index
    /// * `requests` - Documents keyed by their stable id
    ///
    /// # Returns
    ///
    /// * `Ok(BatchOperationSummary)` - One result per request, in request order
    /// * `Err(SearchIndexError)` - If the bulk call failed as a whole (unreachable or overloaded backend)
    async fn bulk_write(
        &self,
        index: &str,
        requests: &[UpsertDocumentRequest],
    ) -> Result<BatchOperationSummary, SearchIndexError>;

    /// Make all prior writes visible to searches.
    async fn refresh(&self, index: &str) -> Result<(), SearchIndexError>;

    /// Read one page of search results.
    async fn search(
        &self,
        index: &str,
        request: &SearchRequest,
    ) -> Result<SearchPage, SearchIndexError>;
}
