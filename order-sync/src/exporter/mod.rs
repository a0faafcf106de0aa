//! Deep-pagination exporter.
//!
//! Reads every key matching a filter from the search index using sort-based
//! (`search_after`) continuation, which is not bounded by the index's result window.

use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::errors::SyncError;
use order_sync_repository::{SearchHit, SearchIndexProvider, SearchRequest};
use order_sync_shared::{normalize_text, SearchAfterCursor};

/// Configuration for the exporter.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub index: String,
    /// Hits per search request.
    pub page_size: usize,
    /// Unique document field holding the key. Also the final sort tie-breaker.
    pub key_field: String,
    /// Optional primary sort field, ahead of `key_field`.
    pub sort_field: Option<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            index: "orders".to_string(),
            page_size: 5000,
            key_field: "orderId".to_string(),
            sort_field: None,
        }
    }
}

impl ExportConfig {
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.page_size == 0 {
            return Err(SyncError::config("export page size must be greater than zero"));
        }
        if self.key_field.is_empty() {
            return Err(SyncError::config("export key field cannot be empty"));
        }
        Ok(())
    }

    /// Sort clauses; always ends with the key field so ties break the same way on every page.
    fn sort(&self) -> Vec<Value> {
        let mut sort = Vec::with_capacity(2);
        if let Some(ref field) = self.sort_field {
            if field != &self.key_field {
                sort.push(json!({ field.as_str(): "asc" }));
            }
        }
        sort.push(json!({ self.key_field.as_str(): "asc" }));
        sort
    }
}

/// Filters an export can apply.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportFilter {
    MatchAll,
    /// Case-insensitive substring match on `<field>.keyword`.
    ///
    /// The keyword is normalized the same way document text is.
    Keyword { field: String, keyword: String },
    /// Exact match on a keyword field.
    Term { field: String, value: String },
    /// Every filter must match.
    All(Vec<ExportFilter>),
}

impl ExportFilter {
    /// Build the query clause.
    pub fn to_query(&self) -> Value {
        match self {
            Self::MatchAll => json!({ "match_all": {} }),
            Self::Keyword { field, keyword } => {
                let pattern = format!("*{}*", escape_wildcard(&normalize_text(keyword)));
                json!({
                    "wildcard": {
                        format!("{}.keyword", field): {
                            "value": pattern,
                            "case_insensitive": true
                        }
                    }
                })
            }
            Self::Term { field, value } => json!({ "term": { field.as_str(): value } }),
            Self::All(filters) if filters.is_empty() => json!({ "match_all": {} }),
            Self::All(filters) => json!({
                "bool": {
                    "must": filters.iter().map(ExportFilter::to_query).collect::<Vec<_>>()
                }
            }),
        }
    }
}

/// Escape the wildcard metacharacters `*`, `?` and `\`.
fn escape_wildcard(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '*' | '?' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Keys gathered by an export.
///
/// `total` is the number of matching documents reported by the index, or 0 if the
/// export failed part-way; `keys` then holds whatever was read before the failure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportResult {
    pub keys: Vec<String>,
    pub total: u64,
}

impl ExportResult {
    /// Whether the export stopped early because of a backend error.
    pub fn is_partial(&self) -> bool {
        self.total == 0 && !self.keys.is_empty()
    }
}

/// Exports every matching key from the index.
pub struct DeepPaginationExporter {
    provider: Arc<dyn SearchIndexProvider>,
    config: ExportConfig,
}

impl DeepPaginationExporter {
    pub fn new(provider: Arc<dyn SearchIndexProvider>, config: ExportConfig) -> Self {
        Self { provider, config }
    }

    /// Read every key matching `filter`.
    ///
    /// Stops at the first empty page or once as many keys as the reported total
    /// have been read, whichever comes first. Never fails: a backend error ends the
    /// export with the keys read so far and `total = 0`.
    #[instrument(skip(self), fields(index = %self.config.index))]
    pub async fn export_all_keys(&self, filter: &ExportFilter) -> ExportResult {
        match self.try_export(filter).await {
            Ok(result) => {
                info!(keys = result.keys.len(), total = result.total, "Export completed");
                result
            }
            Err((keys, error)) => {
                warn!(keys_read = keys.len(), error = %error, "Export aborted");
                ExportResult { keys, total: 0 }
            }
        }
    }

    async fn try_export(
        &self,
        filter: &ExportFilter,
    ) -> Result<ExportResult, (Vec<String>, SyncError)> {
        let mut keys = Vec::new();

        if let Err(e) = self.config.validate() {
            return Err((keys, e));
        }

        let query = filter.to_query();
        let sort = self.config.sort();
        let source_fields = Some(vec![self.config.key_field.clone()]);

        let mut cursor = SearchAfterCursor::start();

        // Each page reports the current total; the last one read is returned.
        let total = loop {
            let request = SearchRequest {
                query: query.clone(),
                sort: sort.clone(),
                size: self.config.page_size,
                search_after: cursor.sort_values().map(<[Value]>::to_vec),
                source_fields: source_fields.clone(),
            };

            let page = match self.provider.search(&self.config.index, &request).await {
                Ok(page) => page,
                Err(e) => {
                    let error = SyncError::partial_export(format!(
                        "Search failed after {} keys: {}",
                        keys.len(),
                        e
                    ));
                    return Err((keys, error));
                }
            };

            let total = page.total;
            let Some(last) = page.hits.last() else {
                break total;
            };
            let next_sort = last.sort.clone();

            keys.extend(page.hits.iter().map(|hit| self.hit_key(hit)));
            debug!(read = keys.len(), total, "Read export page");

            if keys.len() as u64 >= total {
                break total;
            }
            if next_sort.is_empty() {
                let error =
                    SyncError::partial_export("Search hit has no sort values to continue from");
                return Err((keys, error));
            }
            cursor = cursor.advance(next_sort);
        };

        Ok(ExportResult { keys, total })
    }

    /// The key of a hit: the key field from `_source`, or the document id.
    fn hit_key(&self, hit: &SearchHit) -> String {
        match hit.source.get(&self.config.key_field) {
            Some(Value::String(key)) => key.clone(),
            Some(Value::Number(key)) => key.to_string(),
            _ => hit.id.clone(),
        }
    }
}
