//! In-memory collaborators shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use order_sync::orchestrator::{ProgressEvent, ProgressObserver};
use order_sync_repository::{
    BatchOperationResult, BatchOperationSummary, BatchOutcome, CreateIndexOutcome, IndexSchema,
    SearchHit, SearchIndexError, SearchIndexProvider, SearchPage, SearchRequest, SourceFilter,
    SourceStore, SourceStoreError, UpsertDocumentRequest,
};
use order_sync_shared::SourceRecord;

/// In-memory search index.
///
/// Documents are stored by key, so repeated writes overwrite. Searches ignore the
/// query, sort by key and honor `search_after`; the last request is kept for
/// inspection. Mappings are kept so that a stamped schema version survives runs.
pub struct MockSearchProvider {
    pub exists: AtomicBool,
    pub documents: Mutex<BTreeMap<String, Value>>,
    pub mappings: Mutex<Value>,
    pub search_requests: Mutex<Vec<SearchRequest>>,
    /// Names of the calls made, in order.
    pub calls: Mutex<Vec<String>>,
    pub bulk_calls: Arc<AtomicUsize>,
    pub refresh_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
    /// 1-based bulk call numbers that fail as a whole.
    pub failing_bulk_calls: HashSet<usize>,
    /// Keys rejected individually inside an otherwise successful bulk call.
    pub rejected_keys: HashSet<String>,
    pub fail_refresh: bool,
    pub fail_exists_check: bool,
    pub fail_apply_settings: bool,
    /// 1-based search call number that fails.
    pub failing_search_call: Option<usize>,
    /// Added to the reported total of every search.
    pub total_skew: u64,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl MockSearchProvider {
    pub fn new() -> Self {
        Self {
            exists: AtomicBool::new(false),
            documents: Mutex::new(BTreeMap::new()),
            mappings: Mutex::new(json!({})),
            search_requests: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            bulk_calls: Arc::new(AtomicUsize::new(0)),
            refresh_calls: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
            failing_bulk_calls: HashSet::new(),
            rejected_keys: HashSet::new(),
            fail_refresh: false,
            fail_exists_check: false,
            fail_apply_settings: false,
            failing_search_call: None,
            total_skew: 0,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// An index that already exists and holds documents with keys `key-00000..key-{n}`.
    pub fn with_indexed_keys(count: usize) -> Self {
        let provider = Self::new();
        provider.exists.store(true, Ordering::SeqCst);
        {
            let mut documents = provider.documents.lock().unwrap();
            for i in 0..count {
                let key = format!("key-{:05}", i);
                documents.insert(key.clone(), json!({ "orderId": key }));
            }
        }
        provider
    }

    pub fn bulk_calls(&self) -> usize {
        self.bulk_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn close_calls(&self) -> usize {
        self.calls().iter().filter(|call| *call == "close_index").count()
    }

    pub fn search_requests(&self) -> Vec<SearchRequest> {
        self.search_requests.lock().unwrap().clone()
    }

    pub fn document_count(&self) -> usize {
        self.documents.lock().unwrap().len()
    }

    fn log(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }
}

#[async_trait]
impl SearchIndexProvider for MockSearchProvider {
    async fn index_exists(&self, _index: &str) -> Result<bool, SearchIndexError> {
        self.log("index_exists");
        if self.fail_exists_check {
            return Err(SearchIndexError::connection("connection refused"));
        }
        Ok(self.exists.load(Ordering::SeqCst))
    }

    async fn create_index(
        &self,
        _index: &str,
        schema: &IndexSchema,
    ) -> Result<CreateIndexOutcome, SearchIndexError> {
        self.log("create_index");
        if self.exists.swap(true, Ordering::SeqCst) {
            Ok(CreateIndexOutcome::AlreadyExists)
        } else {
            *self.mappings.lock().unwrap() = schema.mappings.clone();
            Ok(CreateIndexOutcome::Created)
        }
    }

    async fn get_settings(&self, _index: &str) -> Result<Value, SearchIndexError> {
        self.log("get_settings");
        Ok(json!({ "index": { "analysis": { "analyzer": { "legacy": { "type": "simple" } } } } }))
    }

    async fn close_index(&self, _index: &str) -> Result<(), SearchIndexError> {
        self.log("close_index");
        Ok(())
    }

    async fn apply_settings(&self, _index: &str, settings: &Value) -> Result<(), SearchIndexError> {
        self.log("apply_settings");
        if self.fail_apply_settings {
            return Err(SearchIndexError::settings("illegal_argument_exception"));
        }
        if settings["analysis"]["analyzer"]["legacy"].is_null() {
            return Err(SearchIndexError::settings("existing analyzer was dropped"));
        }
        Ok(())
    }

    async fn open_index(&self, _index: &str) -> Result<(), SearchIndexError> {
        self.log("open_index");
        Ok(())
    }

    async fn get_mapping(&self, _index: &str) -> Result<Value, SearchIndexError> {
        self.log("get_mapping");
        Ok(self.mappings.lock().unwrap().clone())
    }

    async fn put_mapping(&self, _index: &str, mapping: &Value) -> Result<(), SearchIndexError> {
        self.log("put_mapping");
        let mut current = self.mappings.lock().unwrap();
        if let (Some(current), Some(additions)) = (current.as_object_mut(), mapping.as_object()) {
            for (key, value) in additions {
                current.insert(key.clone(), value.clone());
            }
        }
        Ok(())
    }

    async fn bulk_write(
        &self,
        _index: &str,
        requests: &[UpsertDocumentRequest],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        let call = self.bulk_calls.fetch_add(1, Ordering::SeqCst) + 1;

        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_bulk_calls.contains(&call) {
            return Err(SearchIndexError::connection("connection reset by peer"));
        }

        let mut documents = self.documents.lock().unwrap();
        let results = requests
            .iter()
            .map(|request| {
                let outcome = if self.rejected_keys.contains(&request.key) {
                    BatchOutcome::Failure(SearchIndexError::bulk_index("mapper_parsing_exception"))
                } else {
                    documents.insert(request.key.clone(), request.document.to_value());
                    BatchOutcome::Success
                };
                BatchOperationResult {
                    key: request.key.clone(),
                    outcome,
                }
            })
            .collect();

        Ok(BatchOperationSummary::from_results(results))
    }

    async fn refresh(&self, _index: &str) -> Result<(), SearchIndexError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_refresh {
            return Err(SearchIndexError::refresh("cluster_block_exception"));
        }
        Ok(())
    }

    async fn search(
        &self,
        _index: &str,
        request: &SearchRequest,
    ) -> Result<SearchPage, SearchIndexError> {
        let call = self.search_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.search_requests.lock().unwrap().push(request.clone());
        if self.failing_search_call == Some(call) {
            return Err(SearchIndexError::search("search_phase_execution_exception"));
        }

        let documents = self.documents.lock().unwrap();
        let after = request
            .search_after
            .as_ref()
            .and_then(|values| values.first())
            .and_then(Value::as_str)
            .map(str::to_string);

        let hits = documents
            .iter()
            .filter(|(key, _)| after.as_deref().map_or(true, |after| key.as_str() > after))
            .take(request.size)
            .map(|(key, document)| SearchHit {
                id: key.clone(),
                source: json!({ "orderId": document["orderId"] }),
                sort: vec![json!(key)],
            })
            .collect();

        Ok(SearchPage {
            hits,
            total: documents.len() as u64 + self.total_skew,
        })
    }
}

/// In-memory primary datastore holding records sorted by key.
pub struct MockSourceStore {
    pub records: Vec<SourceRecord>,
    pub page_calls: AtomicUsize,
    /// Bulk call counter of the provider under test, sampled on every page request.
    pub bulk_counter: Option<Arc<AtomicUsize>>,
    pub bulk_calls_at_page: Mutex<Vec<usize>>,
    pub fail_on_page: Option<usize>,
    /// Reported by `count` instead of the real number of records.
    pub count_override: Option<u64>,
}

impl MockSourceStore {
    /// `count` orders with keys `order-00000..`.
    pub fn with_orders(count: usize) -> Self {
        let records = (0..count)
            .map(|i| {
                SourceRecord::new(
                    format!("order-{:05}", i),
                    json!({
                        "orderNameXPwId": format!("ĐƠN-{}", i),
                        "userId": format!("seller-{}", i % 7),
                        "userData": { "email": format!("seller{}@shop.vn", i % 7) },
                        "shippingAddress": { "shippingName": "Nguyễn Văn Bình" }
                    }),
                )
            })
            .collect();

        Self {
            records,
            page_calls: AtomicUsize::new(0),
            bulk_counter: None,
            bulk_calls_at_page: Mutex::new(Vec::new()),
            fail_on_page: None,
            count_override: None,
        }
    }

    pub fn page_calls(&self) -> usize {
        self.page_calls.load(Ordering::SeqCst)
    }

    /// Sample `provider`'s bulk call count whenever a page is requested.
    pub fn watching(mut self, provider: &MockSearchProvider) -> Self {
        self.bulk_counter = Some(provider.bulk_calls.clone());
        self
    }

    pub fn bulk_calls_at_page(&self) -> Vec<usize> {
        self.bulk_calls_at_page.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceStore for MockSourceStore {
    async fn count(&self, _filter: &SourceFilter) -> Result<u64, SourceStoreError> {
        Ok(self
            .count_override
            .unwrap_or(self.records.len() as u64))
    }

    async fn page(
        &self,
        _filter: &SourceFilter,
        skip: u64,
        limit: u64,
        _sort_key: &str,
    ) -> Result<Vec<SourceRecord>, SourceStoreError> {
        let call = self.page_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(ref counter) = self.bulk_counter {
            self.bulk_calls_at_page
                .lock()
                .unwrap()
                .push(counter.load(Ordering::SeqCst));
        }
        if self.fail_on_page == Some(call) {
            return Err(SourceStoreError::DatabaseError(
                "connection terminated".to_string(),
            ));
        }

        Ok(self
            .records
            .iter()
            .skip(skip as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

/// Observer that keeps every event.
#[derive(Default)]
pub struct RecordingObserver {
    pub events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressObserver for RecordingObserver {
    fn on_event(&self, event: &ProgressEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
