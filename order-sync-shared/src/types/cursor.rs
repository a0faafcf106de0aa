//! Pagination cursors.
//!
//! Both cursors are consumed by `advance`, so a cursor value cannot be reused
//! once the next one has been derived from it.

use serde_json::Value;

/// Offset-based cursor over the primary datastore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetCursor {
    skip: u64,
    limit: u64,
}

impl OffsetCursor {
    /// Start at offset zero with the given page size.
    pub fn start(limit: u64) -> Self {
        Self { skip: 0, limit }
    }

    /// Number of records to skip for the page this cursor points at.
    pub fn skip(&self) -> u64 {
        self.skip
    }

    /// Page size.
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Advance past a fixed-size page.
    ///
    /// The offset moves by the page size regardless of how many records came back.
    pub fn advance(self) -> Self {
        Self {
            skip: self.skip + self.limit,
            limit: self.limit,
        }
    }
}

/// Sort-based continuation cursor over the search index (`search_after`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchAfterCursor {
    sort_values: Option<Vec<Value>>,
}

impl SearchAfterCursor {
    /// Cursor for the first page.
    pub fn start() -> Self {
        Self::default()
    }

    /// Sort values to send as `search_after`, or `None` for the first page.
    pub fn sort_values(&self) -> Option<&[Value]> {
        self.sort_values.as_deref()
    }

    /// Whether this cursor points at the first page.
    pub fn is_start(&self) -> bool {
        self.sort_values.is_none()
    }

    /// Advance using the sort values of the last hit of the page just read.
    pub fn advance(self, last_sort_values: Vec<Value>) -> Self {
        Self {
            sort_values: Some(last_sort_values),
        }
    }
}
