//! Index bootstrapper.
//!
//! Ensures the target index exists with the expected schema before any write, and
//! applies schema migrations (new analyzers and mappings) to an existing index.

use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::errors::SyncError;
use order_sync_repository::{
    schema_version, CreateIndexOutcome, IndexSchema, SchemaMigration, SearchIndexProvider,
};

/// Creates and migrates search indices.
pub struct IndexBootstrapper {
    provider: Arc<dyn SearchIndexProvider>,
}

impl IndexBootstrapper {
    pub fn new(provider: Arc<dyn SearchIndexProvider>) -> Self {
        Self { provider }
    }

    /// Make sure `name` exists, creating it with `schema` if needed.
    ///
    /// Safe to call repeatedly and from concurrent callers: an index created by
    /// someone else in the meantime is reported as `AlreadyExists`, not as an error.
    ///
    /// # Returns
    ///
    /// * `Ok(CreateIndexOutcome)` - Whether this call created the index
    /// * `Err(SyncError::Bootstrap)` - If the index could not be checked or created
    #[instrument(skip(self, schema))]
    pub async fn ensure_index(
        &self,
        name: &str,
        schema: &IndexSchema,
    ) -> Result<CreateIndexOutcome, SyncError> {
        let exists = self.provider.index_exists(name).await.map_err(|e| {
            SyncError::bootstrap(format!("Failed to check whether index {} exists: {}", name, e))
        })?;

        if exists {
            info!(index = name, "Index already exists");
            return Ok(CreateIndexOutcome::AlreadyExists);
        }

        let outcome = self
            .provider
            .create_index(name, schema)
            .await
            .map_err(|e| SyncError::bootstrap(format!("Failed to create index {}: {}", name, e)))?;

        match outcome {
            CreateIndexOutcome::Created => info!(index = name, "Index created"),
            CreateIndexOutcome::AlreadyExists => {
                info!(index = name, "Index was created concurrently")
            }
        }
        Ok(outcome)
    }

    /// Apply `migration` to an existing index, unless it already carries that version.
    ///
    /// Runs: read mapping version → read settings → close → merge and apply analysis
    /// → reopen → put mapping stamped with the version. The index is unavailable
    /// between close and reopen, so no sync may run against it meanwhile. If applying
    /// settings fails, the index is still reopened before the error is returned.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - If the migration was applied
    /// * `Ok(false)` - If the index was already at `migration.version` or later
    /// * `Err(SyncError::Bootstrap)` - If any step failed
    #[instrument(skip(self, migration), fields(version = migration.version))]
    pub async fn migrate(&self, name: &str, migration: &SchemaMigration) -> Result<bool, SyncError> {
        let mappings = self.provider.get_mapping(name).await.map_err(|e| {
            SyncError::bootstrap(format!("Failed to read mapping of {}: {}", name, e))
        })?;

        if let Some(current_version) = schema_version(&mappings) {
            if current_version >= migration.version {
                info!(
                    index = name,
                    current_version,
                    "Index schema is up to date, skipping migration"
                );
                return Ok(false);
            }
        }

        let current = self.provider.get_settings(name).await.map_err(|e| {
            SyncError::bootstrap(format!("Failed to read settings of {}: {}", name, e))
        })?;

        let analysis = merge_analysis(&current, &migration.analysis);

        self.provider
            .close_index(name)
            .await
            .map_err(|e| SyncError::bootstrap(format!("Failed to close index {}: {}", name, e)))?;

        let mut body = Map::new();
        body.insert("analysis".to_string(), analysis);
        let applied = self
            .provider
            .apply_settings(name, &Value::Object(body))
            .await;

        let reopened = self.provider.open_index(name).await;

        if let Err(e) = applied {
            if let Err(ref open_err) = reopened {
                error!(index = name, error = %open_err, "Failed to reopen index after settings error");
            }
            return Err(SyncError::bootstrap(format!(
                "Failed to apply settings to {}: {}",
                name, e
            )));
        }

        reopened
            .map_err(|e| SyncError::bootstrap(format!("Failed to reopen index {}: {}", name, e)))?;

        self.provider
            .put_mapping(name, &migration.versioned_mappings())
            .await
            .map_err(|e| SyncError::bootstrap(format!("Failed to update mapping of {}: {}", name, e)))?;

        info!(index = name, "Index schema migrated");
        Ok(true)
    }

    /// Ensure the index exists and, if it already did, migrate it.
    ///
    /// A freshly created index already carries the full schema, so the migration
    /// only runs against pre-existing indices.
    pub async fn bootstrap(
        &self,
        name: &str,
        schema: &IndexSchema,
        migration: Option<&SchemaMigration>,
    ) -> Result<CreateIndexOutcome, SyncError> {
        let outcome = self.ensure_index(name, schema).await?;

        match (outcome, migration) {
            (CreateIndexOutcome::AlreadyExists, Some(migration)) => {
                self.migrate(name, migration).await?;
            }
            (CreateIndexOutcome::AlreadyExists, None) => {
                warn!(index = name, "Index exists, skipping schema migration");
            }
            (CreateIndexOutcome::Created, _) => {}
        }

        Ok(outcome)
    }
}

/// Merge analysis additions over an index's current analysis settings.
///
/// `current_settings` is the object returned by `get_settings`; its analysis lives
/// under `index.analysis` (or directly under `analysis`). Sections of the current
/// analysis that `additions` does not mention are kept as they are. Within a
/// section present in both, entries are merged by name and additions win.
pub fn merge_analysis(current_settings: &Value, additions: &Value) -> Value {
    let existing = current_settings
        .pointer("/index/analysis")
        .or_else(|| current_settings.get("analysis"))
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let mut merged = existing;
    if let Some(additions) = additions.as_object() {
        for (section, entries) in additions {
            match (merged.get_mut(section), entries) {
                (Some(Value::Object(current)), Value::Object(new_entries)) => {
                    for (name, definition) in new_entries {
                        current.insert(name.clone(), definition.clone());
                    }
                }
                _ => {
                    merged.insert(section.clone(), entries.clone());
                }
            }
        }
    }

    Value::Object(merged)
}
