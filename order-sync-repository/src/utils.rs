//! Utility functions for the order sync repository.

use crate::errors::SourceStoreError;

/// Validate a SQL identifier (table, column) before it is interpolated into a query.
///
/// Identifiers must be non-empty, start with a letter or underscore, and contain only
/// ASCII alphanumeric characters and underscores.
///
/// # Arguments
///
/// * `kind` - What the identifier names, used in the error message
/// * `name` - The identifier to validate
///
/// # Example
///
/// ```
/// use order_sync_repository::validate_identifier;
///
/// assert!(validate_identifier("table", "orders").is_ok());
/// assert!(validate_identifier("table", "orders--").is_err());
/// ```
pub fn validate_identifier(kind: &str, name: &str) -> Result<(), SourceStoreError> {
    let mut chars = name.chars();
    let first = chars
        .next()
        .ok_or_else(|| SourceStoreError::validation(format!("{} name cannot be empty", kind)))?;

    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err(SourceStoreError::validation(format!(
            "{} name '{}' must start with a letter or underscore",
            kind, name
        )));
    }

    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(SourceStoreError::validation(format!(
            "{} name '{}' contains invalid characters. Only alphanumeric characters and underscores are allowed",
            kind, name
        )));
    }

    Ok(())
}
