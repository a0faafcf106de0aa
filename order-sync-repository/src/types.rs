//! Request and response types for search index and datastore operations.

use order_sync_shared::IndexDocument;
use serde_json::{json, Map, Value};

use crate::errors::SearchIndexError;

/// Settings and mappings used to create an index.
///
/// Created once per index lifetime. Later changes go through a `SchemaMigration`.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSchema {
    /// Index settings (shards, replicas, analysis).
    pub settings: Value,
    /// Field mappings (`{"properties": {...}}`).
    pub mappings: Value,
}

impl IndexSchema {
    /// Body for the create-index request.
    pub fn to_create_body(&self) -> Value {
        json!({
            "settings": self.settings,
            "mappings": self.mappings,
        })
    }
}

/// Additions applied to an existing index.
///
/// `analysis` sections are merged over the index's current analysis settings,
/// which requires the index to be closed; `mappings` are applied after reopening,
/// together with `version` stamped under `_meta.schema_version`. An index whose
/// stamped version is at least `version` is left alone.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaMigration {
    pub version: u32,
    pub analysis: Value,
    pub mappings: Value,
}

impl SchemaMigration {
    /// The mapping body to put, with this migration's version stamped into `_meta`.
    pub fn versioned_mappings(&self) -> Value {
        let mut mappings = self.mappings.as_object().cloned().unwrap_or_default();
        let mut meta = mappings
            .get("_meta")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        meta.insert(SCHEMA_VERSION_KEY.to_string(), json!(self.version));
        mappings.insert("_meta".to_string(), Value::Object(meta));
        Value::Object(mappings)
    }
}

/// Key under a mapping's `_meta` holding the applied schema version.
pub const SCHEMA_VERSION_KEY: &str = "schema_version";

/// The schema version stamped into a mapping, if any.
pub fn schema_version(mappings: &Value) -> Option<u32> {
    mappings
        .get("_meta")
        .and_then(|meta| meta.get(SCHEMA_VERSION_KEY))
        .and_then(Value::as_u64)
        .and_then(|version| u32::try_from(version).ok())
}

/// Result of a create-index request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateIndexOutcome {
    /// The index was created by this call.
    Created,
    /// The index already existed (possibly created by a concurrent caller).
    AlreadyExists,
}

/// One document to upsert, keyed by its stable id.
///
/// Writing the same key twice overwrites the document, so re-submitting an item
/// that already succeeded leaves the index unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertDocumentRequest {
    /// Document id in the index (the source record key).
    pub key: String,
    /// The document body.
    pub document: IndexDocument,
}

impl UpsertDocumentRequest {
    pub fn new(key: impl Into<String>, document: IndexDocument) -> Self {
        Self {
            key: key.into(),
            document,
        }
    }
}

/// Outcome of a single item in a bulk write.
#[derive(Debug, Clone)]
pub enum BatchOutcome {
    Success,
    Failure(SearchIndexError),
}

impl BatchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Result of a batch operation for a single item.
#[derive(Debug, Clone)]
pub struct BatchOperationResult {
    /// The document key.
    pub key: String,
    /// Whether the item was written.
    pub outcome: BatchOutcome,
}

/// Summary of a batch operation containing aggregate statistics and individual results.
///
/// `results` has exactly one entry per submitted item, in submission order.
#[derive(Debug, Clone, Default)]
pub struct BatchOperationSummary {
    /// Total number of items in the batch.
    pub total: usize,
    /// Number of successful operations.
    pub succeeded: usize,
    /// Number of failed operations.
    pub failed: usize,
    /// Individual results for each item.
    pub results: Vec<BatchOperationResult>,
}

impl BatchOperationSummary {
    /// Build a summary from ordered per-item results.
    pub fn from_results(results: Vec<BatchOperationResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.outcome.is_success()).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }

    /// A summary in which every item failed with the same error.
    ///
    /// Used when the bulk call itself never reached the backend.
    pub fn all_failed<'a>(
        keys: impl IntoIterator<Item = &'a str>,
        error: &SearchIndexError,
    ) -> Self {
        Self::from_results(
            keys.into_iter()
                .map(|key| BatchOperationResult {
                    key: key.to_string(),
                    outcome: BatchOutcome::Failure(error.clone()),
                })
                .collect(),
        )
    }
}

/// A single page request against the index using sort-based continuation.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Query clause (the value of the `query` key).
    pub query: Value,
    /// Sort clauses; must be deterministic so that ties are broken consistently.
    pub sort: Vec<Value>,
    /// Page size.
    pub size: usize,
    /// Sort values of the last hit of the previous page.
    pub search_after: Option<Vec<Value>>,
    /// Restrict `_source` to these fields; `None` returns the whole document.
    pub source_fields: Option<Vec<String>>,
}

impl SearchRequest {
    /// Build the JSON body for the search request.
    ///
    /// Always asks for an exact hit total so that callers can tell when they have
    /// read everything, even beyond the backend's default total cap.
    pub fn to_body(&self) -> Value {
        let mut body = Map::new();
        body.insert("size".to_string(), json!(self.size));
        body.insert("query".to_string(), self.query.clone());
        body.insert("sort".to_string(), Value::Array(self.sort.clone()));
        body.insert("track_total_hits".to_string(), json!(true));
        if let Some(ref search_after) = self.search_after {
            body.insert("search_after".to_string(), Value::Array(search_after.clone()));
        }
        if let Some(ref fields) = self.source_fields {
            body.insert("_source".to_string(), json!(fields));
        }
        Value::Object(body)
    }
}

/// A single search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Document id.
    pub id: String,
    /// Document source (possibly filtered).
    pub source: Value,
    /// Sort values of this hit, used as the next `search_after`.
    pub sort: Vec<Value>,
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchPage {
    pub hits: Vec<SearchHit>,
    /// Total number of documents matching the query.
    pub total: u64,
}

/// Filter applied to the primary datastore.
///
/// A JSON containment document: a record matches when its payload contains every
/// key/value pair of the filter. The empty object matches every record.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFilter(Value);

impl SourceFilter {
    /// Match every record.
    pub fn all() -> Self {
        Self(Value::Object(Map::new()))
    }

    /// Match records whose payload contains `document`.
    pub fn containing(document: Value) -> Self {
        Self(document)
    }

    /// The containment document.
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl Default for SourceFilter {
    fn default() -> Self {
        Self::all()
    }
}
