//! Document types for the search index.
//!
//! This module defines the flattened document shape written to the search engine.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Flattened projection of a `SourceRecord`, ready to be written to the index.
///
/// Fields are kept in a sorted map so that the same record always serializes to
/// the same bytes. No timestamp is stamped on the document; an unchanged record
/// always yields an identical document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct IndexDocument {
    fields: Map<String, Value>,
}

impl IndexDocument {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    /// Get a field value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Get a field value as a string slice, if it is a string.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Iterate over fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    /// Number of fields in the document.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the document has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Convert into a JSON object for the wire.
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }

    /// Borrow as a JSON value for the wire.
    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}
