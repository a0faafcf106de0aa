//! Orchestrator module for the order sync pipeline.
//!
//! The `SyncDriver` copies every record of the primary datastore into the search
//! index: bootstrap the index, page through the source in key order, fan each page
//! out as concurrent bulk writes, flush periodically, and report a summary.

mod progress;

pub use progress::{ProgressEvent, ProgressObserver, SyncProgress, TracingProgressObserver};

use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::bootstrap::IndexBootstrapper;
use crate::errors::SyncError;
use crate::loader::BulkWriter;
use crate::processor::DocumentNormalizer;
use order_sync_repository::{
    IndexSchema, SchemaMigration, SearchIndexProvider, SourceFilter, SourceStore,
};
use order_sync_shared::{OffsetCursor, SourceRecord};

/// Configuration for the sync driver.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Target index.
    pub index: String,
    /// Records per source page.
    pub page_size: u64,
    /// Records per bulk call.
    pub sub_batch_size: usize,
    /// Bulk calls in flight at once.
    pub max_concurrent_batches: usize,
    /// Flush the index after every this many pages.
    pub flush_every_pages: u64,
    /// Stable, unique source column to page by.
    pub sort_key: String,
    pub filter: SourceFilter,
    /// Run the schema migration when the index already exists.
    pub migrate_existing: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            index: "orders".to_string(),
            page_size: 100_000,
            sub_batch_size: 1000,
            max_concurrent_batches: 4,
            flush_every_pages: 1,
            sort_key: "id".to_string(),
            filter: SourceFilter::all(),
            migrate_existing: true,
        }
    }
}

impl SyncConfig {
    /// Reject sizes that would stall or never advance the run.
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.index.is_empty() {
            return Err(SyncError::config("index name cannot be empty"));
        }
        if self.page_size == 0 {
            return Err(SyncError::config("page size must be greater than zero"));
        }
        if self.sub_batch_size == 0 {
            return Err(SyncError::config("sub-batch size must be greater than zero"));
        }
        if self.max_concurrent_batches == 0 {
            return Err(SyncError::config(
                "max concurrent batches must be greater than zero",
            ));
        }
        if self.flush_every_pages == 0 {
            return Err(SyncError::config("flush interval must be greater than zero"));
        }
        Ok(())
    }
}

/// Driver for a full-collection sync.
///
/// Runs `IDLE → BOOTSTRAPPING → PAGING → (FAN_OUT ⇄ FLUSH) → DONE`. Per-document
/// and per-batch failures are counted, never fatal; only bootstrap, source and
/// configuration errors end a run early. There is no checkpoint: every run starts
/// at offset 0, and re-running over an unchanged source rewrites identical documents.
pub struct SyncDriver {
    source: Arc<dyn SourceStore>,
    provider: Arc<dyn SearchIndexProvider>,
    bootstrapper: IndexBootstrapper,
    writer: BulkWriter,
    schema: IndexSchema,
    migration: Option<SchemaMigration>,
    observer: Arc<dyn ProgressObserver>,
    config: SyncConfig,
}

impl SyncDriver {
    /// Create a new driver.
    ///
    /// Progress is reported to a `TracingProgressObserver` unless another observer
    /// is set with `with_observer`.
    pub fn new(
        source: Arc<dyn SourceStore>,
        provider: Arc<dyn SearchIndexProvider>,
        normalizer: DocumentNormalizer,
        schema: IndexSchema,
        config: SyncConfig,
    ) -> Self {
        Self {
            bootstrapper: IndexBootstrapper::new(provider.clone()),
            writer: BulkWriter::new(provider.clone(), normalizer, config.index.clone()),
            source,
            provider,
            schema,
            migration: None,
            observer: Arc::new(TracingProgressObserver),
            config,
        }
    }

    /// Migration applied when the index already exists (and `migrate_existing` is set).
    pub fn with_migration(mut self, migration: SchemaMigration) -> Self {
        self.migration = Some(migration);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Run one full sync.
    ///
    /// # Returns
    ///
    /// * `Ok(SyncProgress)` - The run summary, including failed items
    /// * `Err(SyncError)` - If configuration is invalid, the index cannot be
    ///   bootstrapped, or the source cannot be read
    #[instrument(skip(self), fields(index = %self.config.index))]
    pub async fn run(&self) -> Result<SyncProgress, SyncError> {
        self.config.validate()?;

        // BOOTSTRAPPING: the index is fully migrated before the first write.
        let migration = self
            .migration
            .as_ref()
            .filter(|_| self.config.migrate_existing);
        self.bootstrapper
            .bootstrap(&self.config.index, &self.schema, migration)
            .await?;

        // PAGING
        let total = self.source.count(&self.config.filter).await?;
        info!(total, page_size = self.config.page_size, "Starting sync");

        let mut progress = SyncProgress::start(total);
        let mut cursor = OffsetCursor::start(self.config.page_size);
        let mut page: u64 = 0;

        while cursor.skip() < progress.total_discovered {
            let records = self
                .source
                .page(
                    &self.config.filter,
                    cursor.skip(),
                    cursor.limit(),
                    &self.config.sort_key,
                )
                .await?;

            if records.is_empty() {
                debug!(skip = cursor.skip(), "Source exhausted");
                break;
            }

            page += 1;
            progress.record_page(cursor.skip(), records.len());
            debug!(page, skip = cursor.skip(), fetched = records.len(), "Fetched page");

            self.fan_out(page, &records, &mut progress).await;

            if page % self.config.flush_every_pages == 0 {
                self.flush(page, &mut progress).await;
            }

            cursor = cursor.advance();
        }

        // DONE: make the last page queryable before summarizing.
        self.flush(page, &mut progress).await;

        progress.finish();
        self.observer.on_event(&ProgressEvent::Completed {
            progress: progress.clone(),
        });
        Ok(progress)
    }

    /// Write one page as sub-batches, at most `max_concurrent_batches` at a time.
    ///
    /// Every group of sub-batches completes before the next group starts, and every
    /// group of the page completes before this returns.
    async fn fan_out(&self, page: u64, records: &[SourceRecord], progress: &mut SyncProgress) {
        let sub_batches: Vec<&[SourceRecord]> =
            records.chunks(self.config.sub_batch_size).collect();

        for group in sub_batches.chunks(self.config.max_concurrent_batches) {
            let summaries = join_all(
                group
                    .iter()
                    .map(|sub_batch| self.writer.write_records(sub_batch)),
            )
            .await;

            for summary in summaries {
                progress.record_batch(&summary);
                self.observer.on_event(&ProgressEvent::BatchCompleted {
                    page,
                    succeeded: summary.succeeded,
                    failed: summary.failed,
                    progress: progress.clone(),
                });
            }
        }
    }

    /// Refresh the index. Failures are reported and counted, never returned.
    async fn flush(&self, page: u64, progress: &mut SyncProgress) {
        let error = self
            .provider
            .refresh(&self.config.index)
            .await
            .err()
            .map(|e| SyncError::transient_write(format!("Refresh failed: {}", e)));

        progress.record_flush(error.is_none());
        self.observer.on_event(&ProgressEvent::Flushed {
            page,
            error,
            progress: progress.clone(),
        });
    }
}
