//! Error types for the order sync pipeline.

use order_sync_repository::SourceStoreError;
use thiserror::Error;

/// Errors that can occur while syncing or exporting.
///
/// Only `Bootstrap`, `Source` and `Config` ever end a run. `TransientWrite` and
/// `PartialExport` are recorded against the affected items and logged; they are
/// never returned from a sync run or an export.
#[derive(Error, Debug, Clone)]
pub enum SyncError {
    /// The index or its schema could not be established.
    #[error("Bootstrap error: {0}")]
    Bootstrap(String),

    /// A bulk write or flush failed.
    #[error("Transient write error: {0}")]
    TransientWrite(String),

    /// An export stopped before reading every matching key.
    #[error("Partial export: {0}")]
    PartialExport(String),

    /// The primary datastore could not be read.
    #[error("Source error: {0}")]
    Source(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SyncError {
    /// Create a bootstrap error.
    pub fn bootstrap(msg: impl Into<String>) -> Self {
        Self::Bootstrap(msg.into())
    }

    /// Create a transient write error.
    pub fn transient_write(msg: impl Into<String>) -> Self {
        Self::TransientWrite(msg.into())
    }

    /// Create a partial export error.
    pub fn partial_export(msg: impl Into<String>) -> Self {
        Self::PartialExport(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<SourceStoreError> for SyncError {
    fn from(err: SourceStoreError) -> Self {
        Self::Source(err.to_string())
    }
}
