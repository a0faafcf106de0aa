//! Configuration types for the repository implementations.

use std::fmt;

use crate::errors::SourceStoreError;
use crate::utils::validate_identifier;

/// Connection settings for the OpenSearch provider.
///
/// `Debug` output never includes the password.
#[derive(Clone)]
pub struct OpenSearchConfig {
    /// Server URL (e.g., "http://localhost:9200").
    pub url: String,
    /// Basic auth username. Auth is only sent when both username and password are set.
    pub username: Option<String>,
    /// Basic auth password.
    pub password: Option<String>,
}

impl OpenSearchConfig {
    /// Create a config without authentication.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
        }
    }

    /// Set basic auth credentials.
    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Credentials, if both halves are configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some((user.as_str(), pass.as_str())),
            _ => None,
        }
    }
}

impl fmt::Debug for OpenSearchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenSearchConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Table layout for the PostgreSQL source store.
///
/// Records live in one table: a unique key column and a JSONB payload column.
/// Names are interpolated into SQL, so they are validated as plain identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTableConfig {
    /// Table name.
    pub table: String,
    /// Unique, stable key column (also the default sort key).
    pub key_column: String,
    /// JSONB payload column.
    pub data_column: String,
}

impl Default for SourceTableConfig {
    fn default() -> Self {
        Self {
            table: "orders".to_string(),
            key_column: "id".to_string(),
            data_column: "data".to_string(),
        }
    }
}

impl SourceTableConfig {
    /// Validate every identifier.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If all names are safe to interpolate
    /// * `Err(SourceStoreError::ValidationError)` - Otherwise
    pub fn validate(&self) -> Result<(), SourceStoreError> {
        validate_identifier("table", &self.table)?;
        validate_identifier("key column", &self.key_column)?;
        validate_identifier("data column", &self.data_column)?;
        Ok(())
    }
}
