//! OpenSearch provider implementation.
//!
//! This module provides the concrete implementation of `SearchIndexProvider`
//! using the OpenSearch Rust crate.

use async_trait::async_trait;
use opensearch::{
    auth::Credentials,
    http::{
        request::JsonBody,
        response::Response,
        transport::{SingleNodeConnectionPool, TransportBuilder},
    },
    indices::{
        IndicesCloseParts, IndicesCreateParts, IndicesExistsParts, IndicesGetMappingParts,
        IndicesGetSettingsParts, IndicesOpenParts, IndicesPutMappingParts, IndicesPutSettingsParts, IndicesRefreshParts,
    },
    BulkParts, OpenSearch, SearchParts,
};
use serde_json::{json, Value};
use tracing::{debug, error, info};
use url::Url;

use crate::config::OpenSearchConfig;
use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::types::{
    BatchOperationResult, BatchOperationSummary, BatchOutcome, CreateIndexOutcome, IndexSchema,
    SearchHit, SearchPage, SearchRequest, UpsertDocumentRequest,
};

/// OpenSearch provider implementation.
///
/// # Example
///
/// ```ignore
/// use order_sync_repository::{OpenSearchConfig, OpenSearchProvider};
/// use order_sync_repository::opensearch::orders_index_schema;
///
/// let provider = OpenSearchProvider::new(&OpenSearchConfig::new("http://localhost:9200")).await?;
/// provider.create_index("orders", &orders_index_schema()).await?;
/// ```
pub struct OpenSearchProvider {
    client: OpenSearch,
}

impl OpenSearchProvider {
    /// Create a new OpenSearch provider.
    ///
    /// # Arguments
    ///
    /// * `config` - Server URL and optional basic auth credentials
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchProvider)` - A new provider instance
    /// * `Err(SearchIndexError)` - If connection setup fails
    pub async fn new(config: &OpenSearchConfig) -> Result<Self, SearchIndexError> {
        let parsed_url =
            Url::parse(&config.url).map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let mut builder = TransportBuilder::new(conn_pool).disable_proxy();

        if let Some((username, password)) = config.credentials() {
            builder = builder.auth(Credentials::Basic(
                username.to_string(),
                password.to_string(),
            ));
        }

        let transport = builder
            .build()
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(
            url = %config.url,
            basic_auth = config.credentials().is_some(),
            "Created OpenSearch provider"
        );

        Ok(Self { client })
    }

    /// Turn a non-success response into an error built by `make_error`.
    async fn check_status(
        response: Response,
        operation: &str,
        make_error: fn(String) -> SearchIndexError,
    ) -> Result<Response, SearchIndexError> {
        let status = response.status_code();
        if status.is_success() {
            return Ok(response);
        }

        let error_body = response.text().await.unwrap_or_default();
        error!(status = %status, body = %error_body, operation, "OpenSearch request failed");
        Err(make_error(format!(
            "{} failed with status {}: {}",
            operation, status, error_body
        )))
    }

    /// Build the NDJSON lines of a bulk request.
    ///
    /// Every document is written with an `index` action keyed by its id, so a
    /// repeated key overwrites rather than duplicates.
    fn bulk_operations(requests: &[UpsertDocumentRequest]) -> Vec<Value> {
        let mut lines = Vec::with_capacity(requests.len() * 2);
        for request in requests {
            lines.push(json!({ "index": { "_id": request.key } }));
            lines.push(request.document.to_value());
        }
        lines
    }

    /// Map a bulk response onto the submitted requests, preserving their order.
    ///
    /// Items missing from the response are reported as failures.
    fn parse_bulk_response(
        requests: &[UpsertDocumentRequest],
        body: &Value,
    ) -> BatchOperationSummary {
        let items = body
            .get("items")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let results = requests
            .iter()
            .enumerate()
            .map(|(position, request)| {
                let outcome = match items.get(position).and_then(Self::bulk_item_action) {
                    Some(action) => Self::bulk_item_outcome(action),
                    None => BatchOutcome::Failure(SearchIndexError::bulk_index(
                        "Bulk response has no item for this document",
                    )),
                };
                BatchOperationResult {
                    key: request.key.clone(),
                    outcome,
                }
            })
            .collect();

        BatchOperationSummary::from_results(results)
    }

    /// The single action object (`index`, `create`, ...) inside a bulk response item.
    fn bulk_item_action(item: &Value) -> Option<&Value> {
        item.as_object().and_then(|object| object.values().next())
    }

    fn bulk_item_outcome(action: &Value) -> BatchOutcome {
        if let Some(error) = action.get("error") {
            let error_type = error
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            let reason = error.get("reason").and_then(Value::as_str).unwrap_or("");
            return BatchOutcome::Failure(SearchIndexError::bulk_index(format!(
                "{}: {}",
                error_type, reason
            )));
        }

        match action.get("status").and_then(Value::as_u64) {
            Some(status) if (200..300).contains(&status) => BatchOutcome::Success,
            Some(status) => BatchOutcome::Failure(SearchIndexError::bulk_index(format!(
                "Item failed with status {}",
                status
            ))),
            None => BatchOutcome::Failure(SearchIndexError::parse(
                "Bulk item has no status".to_string(),
            )),
        }
    }

    /// Parse a search response into hits and the exact total.
    fn parse_search_response(body: &Value) -> Result<SearchPage, SearchIndexError> {
        let hits_section = body
            .get("hits")
            .ok_or_else(|| SearchIndexError::parse("Search response has no hits section"))?;

        // `total` is an object (`{"value": n}`) on recent versions, a bare number on old ones.
        let total = match hits_section.get("total") {
            Some(Value::Number(n)) => n.as_u64(),
            Some(total) => total.get("value").and_then(Value::as_u64),
            None => None,
        }
        .ok_or_else(|| SearchIndexError::parse("Search response has no hit total"))?;

        let hits = hits_section
            .get("hits")
            .and_then(Value::as_array)
            .ok_or_else(|| SearchIndexError::parse("Search response has no hits array"))?
            .iter()
            .map(|hit| SearchHit {
                id: hit
                    .get("_id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                source: hit.get("_source").cloned().unwrap_or(Value::Null),
                sort: hit
                    .get("sort")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default(),
            })
            .collect();

        Ok(SearchPage { hits, total })
    }

    /// Extract `section` (`settings` or `mappings`) of the single index in a
    /// get-settings or get-mapping response.
    ///
    /// The response is keyed by concrete index name, which differs from the
    /// requested name when that name is an alias.
    fn extract_index_section(body: &Value, section: &str) -> Result<Value, SearchIndexError> {
        body.as_object()
            .and_then(|indices| indices.values().next())
            .and_then(|index| index.get(section))
            .cloned()
            .ok_or_else(|| SearchIndexError::parse(format!("Response has no {}", section)))
    }
}

#[async_trait]
impl SearchIndexProvider for OpenSearchProvider {
    async fn index_exists(&self, index: &str) -> Result<bool, SearchIndexError> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        match response.status_code().as_u16() {
            200 => Ok(true),
            404 => Ok(false),
            status => Err(SearchIndexError::unknown(format!(
                "Index exists check returned status {}",
                status
            ))),
        }
    }

    /// Create the index, treating "already exists" as a non-error outcome.
    ///
    /// A concurrent creator may win between an exists check and this call; the
    /// backend then answers with `resource_already_exists_exception`.
    async fn create_index(
        &self,
        index: &str,
        schema: &IndexSchema,
    ) -> Result<CreateIndexOutcome, SearchIndexError> {
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(schema.to_create_body())
            .send()
            .await
            .map_err(|e| SearchIndexError::index_creation(e.to_string()))?;

        let status = response.status_code();
        if status.is_success() {
            info!(index, "Created index");
            return Ok(CreateIndexOutcome::Created);
        }

        let error_body = response.text().await.unwrap_or_default();
        if error_body.contains("resource_already_exists_exception") {
            debug!(index, "Index already exists");
            return Ok(CreateIndexOutcome::AlreadyExists);
        }

        error!(status = %status, body = %error_body, "Create index request failed");
        Err(SearchIndexError::index_creation(format!(
            "Create index {} failed with status {}: {}",
            index, status, error_body
        )))
    }

    async fn get_settings(&self, index: &str) -> Result<Value, SearchIndexError> {
        let response = self
            .client
            .indices()
            .get_settings(IndicesGetSettingsParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| SearchIndexError::settings(e.to_string()))?;

        let response =
            Self::check_status(response, "Get settings", SearchIndexError::SettingsError).await?;
        let body = response
            .json::<Value>()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;

        Self::extract_index_section(&body, "settings")
    }

    async fn close_index(&self, index: &str) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .indices()
            .close(IndicesCloseParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| SearchIndexError::settings(e.to_string()))?;

        Self::check_status(response, "Close index", SearchIndexError::SettingsError).await?;
        debug!(index, "Index closed");
        Ok(())
    }

    async fn apply_settings(&self, index: &str, settings: &Value) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .indices()
            .put_settings(IndicesPutSettingsParts::Index(&[index]))
            .body(settings.clone())
            .send()
            .await
            .map_err(|e| SearchIndexError::settings(e.to_string()))?;

        Self::check_status(response, "Put settings", SearchIndexError::SettingsError).await?;
        debug!(index, "Index settings applied");
        Ok(())
    }

    async fn open_index(&self, index: &str) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .indices()
            .open(IndicesOpenParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| SearchIndexError::settings(e.to_string()))?;

        Self::check_status(response, "Open index", SearchIndexError::SettingsError).await?;
        debug!(index, "Index opened");
        Ok(())
    }

    async fn get_mapping(&self, index: &str) -> Result<Value, SearchIndexError> {
        let response = self
            .client
            .indices()
            .get_mapping(IndicesGetMappingParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| SearchIndexError::mapping(e.to_string()))?;

        let response =
            Self::check_status(response, "Get mapping", SearchIndexError::MappingError).await?;
        let body = response
            .json::<Value>()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;

        Self::extract_index_section(&body, "mappings")
    }

    async fn put_mapping(&self, index: &str, mapping: &Value) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .indices()
            .put_mapping(IndicesPutMappingParts::Index(&[index]))
            .body(mapping.clone())
            .send()
            .await
            .map_err(|e| SearchIndexError::mapping(e.to_string()))?;

        Self::check_status(response, "Put mapping", SearchIndexError::MappingError).await?;
        debug!(index, "Index mapping updated");
        Ok(())
    }

    /// Upsert documents with a single `_bulk` call.
    ///
    /// A transport error or non-success status fails the whole call. Otherwise the
    /// per-item statuses in the response decide each document's outcome.
    async fn bulk_write(
        &self,
        index: &str,
        requests: &[UpsertDocumentRequest],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        if requests.is_empty() {
            return Ok(BatchOperationSummary::default());
        }

        let body: Vec<JsonBody<Value>> = Self::bulk_operations(requests)
            .into_iter()
            .map(JsonBody::new)
            .collect();

        let response = self
            .client
            .bulk(BulkParts::Index(index))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let response =
            Self::check_status(response, "Bulk write", SearchIndexError::BulkIndexError).await?;
        let body = response
            .json::<Value>()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;

        let summary = Self::parse_bulk_response(requests, &body);
        debug!(
            index,
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Bulk write completed"
        );
        Ok(summary)
    }

    async fn refresh(&self, index: &str) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .indices()
            .refresh(IndicesRefreshParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| SearchIndexError::refresh(e.to_string()))?;

        Self::check_status(response, "Refresh", SearchIndexError::RefreshError).await?;
        Ok(())
    }

    async fn search(
        &self,
        index: &str,
        request: &SearchRequest,
    ) -> Result<SearchPage, SearchIndexError> {
        let response = self
            .client
            .search(SearchParts::Index(&[index]))
            .body(request.to_body())
            .send()
            .await
            .map_err(|e| SearchIndexError::search(e.to_string()))?;

        let response =
            Self::check_status(response, "Search", SearchIndexError::SearchError).await?;
        let body = response
            .json::<Value>()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;

        Self::parse_search_response(&body)
    }
}
