//! Records read from the primary datastore.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A record as read from the primary datastore.
///
/// The pipeline treats the payload as opaque JSON and only ever reads from it.
/// `key` is the stable unique identifier used both for ordering pages in the
/// primary store and as the document id in the search index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceRecord {
    pub key: String,
    pub data: Value,
}

impl SourceRecord {
    /// Create a new record.
    ///
    /// # Example
    ///
    /// ```
    /// use order_sync_shared::SourceRecord;
    /// use serde_json::json;
    ///
    /// let record = SourceRecord::new("65f1c0", json!({ "sku": "SKU-1" }));
    /// assert_eq!(record.field("sku"), Some(&json!("SKU-1")));
    /// ```
    pub fn new(key: impl Into<String>, data: Value) -> Self {
        Self {
            key: key.into(),
            data,
        }
    }

    /// Look up a value by dotted path (e.g. `"shippingAddress.shippingName"`).
    ///
    /// Returns `None` when any segment is missing, when an intermediate value is
    /// not an object, or when the final value is JSON `null`.
    pub fn field(&self, path: &str) -> Option<&Value> {
        let mut current = &self.data;
        for segment in path.split('.') {
            current = current.as_object()?.get(segment)?;
        }
        if current.is_null() {
            None
        } else {
            Some(current)
        }
    }
}
