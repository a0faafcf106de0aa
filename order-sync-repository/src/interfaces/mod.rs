//! Interface definitions for the sync pipeline's collaborators.
//!
//! This module defines the abstract `SearchIndexProvider` and `SourceStore`
//! traits that allow for dependency injection and swappable backends.

mod search_index_provider;
mod source_store;

pub use search_index_provider::SearchIndexProvider;
pub use source_store::SourceStore;
