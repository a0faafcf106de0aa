//! Loader module for the order sync pipeline.
//!
//! Normalizes records and writes them to the search index in bulk.

use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

use crate::processor::DocumentNormalizer;
use order_sync_repository::{
    BatchOperationSummary, BatchOutcome, SearchIndexProvider, UpsertDocumentRequest,
};
use order_sync_shared::SourceRecord;

/// Writer that upserts documents into the search index.
///
/// Each call is exactly one bulk request. The returned summary always has one
/// result per submitted item, in submission order, even when the bulk request
/// itself fails.
pub struct BulkWriter {
    provider: Arc<dyn SearchIndexProvider>,
    normalizer: DocumentNormalizer,
    index: String,
}

impl BulkWriter {
    /// Create a new bulk writer for `index`.
    pub fn new(
        provider: Arc<dyn SearchIndexProvider>,
        normalizer: DocumentNormalizer,
        index: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            normalizer,
            index: index.into(),
        }
    }

    /// The target index.
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Normalize records and write them as one bulk request.
    pub async fn write_records(&self, records: &[SourceRecord]) -> BatchOperationSummary {
        let batch: Vec<UpsertDocumentRequest> = records
            .iter()
            .map(|record| {
                UpsertDocumentRequest::new(record.key.clone(), self.normalizer.normalize(record))
            })
            .collect();

        self.write(&batch).await
    }

    /// Write a batch of keyed documents as one bulk request.
    ///
    /// If the backend is unreachable or rejects the request as a whole, every item
    /// is reported as failed with that error.
    #[instrument(skip(self, batch), fields(index = %self.index, count = batch.len()))]
    pub async fn write(&self, batch: &[UpsertDocumentRequest]) -> BatchOperationSummary {
        if batch.is_empty() {
            return BatchOperationSummary::default();
        }

        match self.provider.bulk_write(&self.index, batch).await {
            Ok(summary) => {
                if summary.failed > 0 {
                    warn!(
                        succeeded = summary.succeeded,
                        failed = summary.failed,
                        "Bulk write completed with some failures"
                    );
                    for result in &summary.results {
                        if let BatchOutcome::Failure(ref err) = result.outcome {
                            debug!(key = %result.key, error = %err, "Failed to write document");
                        }
                    }
                } else {
                    debug!(count = summary.succeeded, "Successfully wrote all documents");
                }
                summary
            }
            Err(e) => {
                error!(error = %e, count = batch.len(), "Bulk write request failed");
                BatchOperationSummary::all_failed(batch.iter().map(|r| r.key.as_str()), &e)
            }
        }
    }
}
