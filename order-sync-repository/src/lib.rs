//! # Order Sync Repository
//!
//! This crate provides the traits and implementations the sync pipeline uses to
//! talk to its two collaborators: the search index (written to in bulk, read with
//! sort-based cursors) and the primary datastore (read-only, paged by offset).
//! It includes error definitions, interfaces, and concrete implementations for
//! OpenSearch and PostgreSQL.

pub mod config;
pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod postgres;
pub mod types;
pub mod utils;

pub use config::{OpenSearchConfig, SourceTableConfig};
pub use errors::{SearchIndexError, SourceStoreError};
pub use interfaces::{SearchIndexProvider, SourceStore};
pub use opensearch::OpenSearchProvider;
pub use postgres::PostgresSourceStore;
pub use types::{
    BatchOperationResult, BatchOperationSummary, BatchOutcome, CreateIndexOutcome, IndexSchema,
    SchemaMigration, SearchHit, SearchPage, SearchRequest, SourceFilter, UpsertDocumentRequest,
};
pub use types::{schema_version, SCHEMA_VERSION_KEY};
pub use utils::validate_identifier;
