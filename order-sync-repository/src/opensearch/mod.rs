//! OpenSearch implementation of the search index provider.
//!
//! This module provides a concrete implementation of `SearchIndexProvider`
//! using OpenSearch as the backend.

mod index_config;
mod provider;

pub use index_config::{
    orders_analysis_migration, orders_index_schema, INDEX_NAME, ORDERS_SCHEMA_VERSION,
};
pub use provider::OpenSearchProvider;
