//! Document normalizer implementation.
//!
//! Projects primary-store records onto flat `IndexDocument`s according to a
//! `DocumentMapping`. Normalization is pure and total: a missing or null field
//! becomes an empty string, never an error.

use order_sync_shared::{normalize_text, IndexDocument, SourceRecord};
use serde_json::Value;

/// Where a document field takes its value from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSource {
    /// The record's key.
    Key,
    /// A dotted path into the record's payload (e.g. `shippingAddress.shippingName`).
    Path(String),
}

/// One field of the index document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    /// Field name in the index document.
    pub target: String,
    pub source: FieldSource,
    /// Fold the value with `normalize_text` (scalars only).
    pub normalize: bool,
}

impl FieldMapping {
    /// Copy the value at `path` unchanged.
    pub fn copy(target: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            source: FieldSource::Path(path.into()),
            normalize: false,
        }
    }

    /// Copy the value at `path` as normalized text.
    pub fn normalized(target: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            source: FieldSource::Path(path.into()),
            normalize: true,
        }
    }

    /// Store the record key.
    pub fn key(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            source: FieldSource::Key,
            normalize: false,
        }
    }
}

/// How records are projected onto index documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMapping {
    pub fields: Vec<FieldMapping>,
    /// Name of the free-text search field.
    pub search_field: String,
    /// Payload paths concatenated (in order) into the search field.
    pub search_sources: Vec<String>,
}

impl DocumentMapping {
    /// The mapping used for the orders index.
    pub fn orders() -> Self {
        Self {
            fields: vec![
                FieldMapping::key("orderId"),
                FieldMapping::normalized("orderNameXPwId", "orderNameXPwId"),
                FieldMapping::normalized("shippingName", "shippingAddress.shippingName"),
                FieldMapping::copy("sellerId", "userId"),
                FieldMapping::copy("sellerEmail", "userData.email"),
            ],
            search_field: "keywordSearch".to_string(),
            search_sources: vec![
                "orderNameXPwId".to_string(),
                "shippingAddress.shippingName".to_string(),
            ],
        }
    }
}

/// Transforms source records into search documents.
#[derive(Debug, Clone)]
pub struct DocumentNormalizer {
    mapping: DocumentMapping,
}

impl DocumentNormalizer {
    /// Create a new normalizer with the given mapping.
    pub fn new(mapping: DocumentMapping) -> Self {
        Self { mapping }
    }

    pub fn mapping(&self) -> &DocumentMapping {
        &self.mapping
    }

    /// Normalize a single record.
    ///
    /// The same record always produces a byte-identical document.
    pub fn normalize(&self, record: &SourceRecord) -> IndexDocument {
        let mut document = IndexDocument::new();

        for field in &self.mapping.fields {
            let value = match &field.source {
                FieldSource::Key => Value::String(record.key.clone()),
                FieldSource::Path(path) => match record.field(path) {
                    Some(value) if field.normalize => Value::String(
                        scalar_text(value)
                            .map(|text| normalize_text(&text))
                            .unwrap_or_default(),
                    ),
                    Some(value) => value.clone(),
                    None => Value::String(String::new()),
                },
            };
            document.insert(field.target.clone(), value);
        }

        document.insert(
            self.mapping.search_field.clone(),
            Value::String(self.search_text(record)),
        );

        document
    }

    /// Build the free-text search field: truthy source values, space-joined, normalized.
    fn search_text(&self, record: &SourceRecord) -> String {
        let parts: Vec<String> = self
            .mapping
            .search_sources
            .iter()
            .filter_map(|path| record.field(path))
            .filter(|value| is_truthy(value))
            .filter_map(scalar_text)
            .collect();

        normalize_text(&parts.join(" "))
    }
}

impl Default for DocumentNormalizer {
    fn default() -> Self {
        Self::new(DocumentMapping::orders())
    }
}

/// Text form of a scalar value; `None` for null, arrays and objects.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Empty strings, zero, false and null are skipped when building the search field.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
