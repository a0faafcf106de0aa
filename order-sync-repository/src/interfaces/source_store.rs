//! Primary datastore trait definition.

use async_trait::async_trait;
use order_sync_shared::SourceRecord;

use crate::errors::SourceStoreError;
use crate::types::SourceFilter;

/// Read-only access to the primary datastore.
///
/// The sync pipeline never writes through this trait and takes no locks; pages are
/// read with offset-based cursors ordered by a stable key.
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Count the records matching `filter`.
    async fn count(&self, filter: &SourceFilter) -> Result<u64, SourceStoreError>;

    /// Read one page of records matching `filter`.
    ///
    /// # Arguments
    ///
    /// * `filter` - Which records to read
    /// * `skip` - Number of matching records to skip
    /// * `limit` - Maximum number of records to return
    /// * `sort_key` - Stable, unique key to order by
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<SourceRecord>)` - Records in `sort_key` order; empty once the source is exhausted
    /// * `Err(SourceStoreError)` - If the page could not be read
    async fn page(
        &self,
        filter: &SourceFilter,
        skip: u64,
        limit: u64,
        sort_key: &str,
    ) -> Result<Vec<SourceRecord>, SourceStoreError>;
}
