//! # Order Sync
//!
//! Bulk sync of orders from the primary datastore (PostgreSQL) into the search
//! index (OpenSearch), plus a deep-pagination export of matching keys.
//!
//! ## Architecture
//!
//! The sync follows the Source-Processor-Loader pattern:
//!
//! 1. **Source**: Pages records out of the primary datastore in key order
//! 2. **Processor**: Normalizes records into search documents
//! 3. **Loader**: Upserts documents with bulk writes
//! 4. **Orchestrator**: Drives the run (bootstrap, paging, fan-out, flushes, summary)
//!
//! ## Modules
//!
//! - [`config`]: Settings and dependency initialization
//! - [`bootstrap`]: Index creation and schema migration
//! - [`processor`]: Transforms records into documents
//! - [`loader`]: Bulk writes into the search index
//! - [`orchestrator`]: The sync driver and its progress reporting
//! - [`exporter`]: Deep-pagination key export
//! - [`errors`]: Error types for the pipeline

pub mod bootstrap;
pub mod config;
pub mod errors;
pub mod exporter;
pub mod loader;
pub mod orchestrator;
pub mod processor;

pub use config::Dependencies;
pub use errors::SyncError;

use thiserror::Error;

/// Errors that can occur during startup or while running a command.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Sync or export error.
    #[error("Sync error: {0}")]
    SyncError(#[from] SyncError),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
