use thiserror::Error;

/// Errors that can occur while reading from the primary datastore.
#[derive(Debug, Clone, Error)]
pub enum SourceStoreError {
    /// Invalid table/column configuration or filter.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// The query could not be executed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// A row could not be decoded into a `SourceRecord`.
    #[error("Decode error: {0}")]
    DecodeError(String),
}

impl SourceStoreError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create a decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::DecodeError(msg.into())
    }
}

impl From<sqlx::Error> for SourceStoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::DatabaseError(err.to_string())
    }
}
