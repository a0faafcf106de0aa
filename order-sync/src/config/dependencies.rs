//! Dependency initialization and wiring for the order sync pipeline.

use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::{ConnectionMode, SyncSettings};
use crate::exporter::DeepPaginationExporter;
use crate::orchestrator::SyncDriver;
use crate::processor::DocumentNormalizer;
use crate::AppError;
use order_sync_repository::opensearch::{orders_analysis_migration, orders_index_schema};
use order_sync_repository::{
    OpenSearchConfig, OpenSearchProvider, PostgresSourceStore, SearchIndexProvider, SourceStore,
};

/// Container for all initialized dependencies.
///
/// Owns the client handles for the lifetime of the process. Call `shutdown` before
/// exiting to close the database pool.
pub struct Dependencies {
    pub settings: SyncSettings,
    pub search_provider: Arc<dyn SearchIndexProvider>,
    pub source_store: Arc<dyn SourceStore>,
    pool: sqlx::PgPool,
}

impl Dependencies {
    /// Initialize all dependencies from environment variables.
    ///
    /// See `SyncSettings::from_env` for the variables read.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(AppError)` - If settings are invalid or a connection fails
    ///   (OpenSearch only fails in fail-fast mode)
    pub async fn new() -> Result<Self, AppError> {
        let settings = SyncSettings::from_env()?;

        info!(
            opensearch_url = %settings.opensearch.url,
            connection_mode = ?settings.connection_mode,
            retry_interval_secs = settings.retry_interval.as_secs(),
            index = %settings.sync.index,
            source_table = %settings.source_table.table,
            "Initializing dependencies"
        );

        let search_provider = Self::connect_to_opensearch(
            &settings.opensearch,
            &settings.sync.index,
            settings.connection_mode,
            settings.retry_interval,
        )
        .await?;

        info!("OpenSearch connection established");

        let pool = PgPoolOptions::new()
            .max_connections(settings.pg_max_connections)
            .connect(&settings.database_url)
            .await
            .map_err(|e| AppError::config(format!("Failed to connect to PostgreSQL: {}", e)))?;

        info!("PostgreSQL connection established");

        let source_store = PostgresSourceStore::new(pool.clone(), settings.source_table.clone())
            .map_err(|e| AppError::config(e.to_string()))?;

        Ok(Self {
            settings,
            search_provider: Arc::new(search_provider),
            source_store: Arc::new(source_store),
            pool,
        })
    }

    /// Build the sync driver for the orders index.
    pub fn sync_driver(&self) -> SyncDriver {
        SyncDriver::new(
            self.source_store.clone(),
            self.search_provider.clone(),
            DocumentNormalizer::default(),
            orders_index_schema(),
            self.settings.sync.clone(),
        )
        .with_migration(orders_analysis_migration())
    }

    /// Build the deep-pagination exporter.
    pub fn exporter(&self) -> DeepPaginationExporter {
        DeepPaginationExporter::new(self.search_provider.clone(), self.settings.export.clone())
    }

    /// Close connection pools.
    pub async fn shutdown(self) {
        self.pool.close().await;
        info!("Dependencies shut down");
    }

    /// Connect to OpenSearch with retry logic based on connection mode.
    async fn connect_to_opensearch(
        config: &OpenSearchConfig,
        index: &str,
        mode: ConnectionMode,
        retry_interval: Duration,
    ) -> Result<OpenSearchProvider, AppError> {
        loop {
            match Self::try_connect_opensearch(config, index).await {
                Ok(provider) => return Ok(provider),
                Err(e) => match mode {
                    ConnectionMode::FailFast => {
                        return Err(AppError::config(format!(
                            "Failed to connect to OpenSearch: {}",
                            e
                        )));
                    }
                    ConnectionMode::Retry => {
                        warn!(
                            opensearch_url = %config.url,
                            error = %e,
                            retry_interval_secs = retry_interval.as_secs(),
                            "Failed to connect to OpenSearch, retrying..."
                        );
                        sleep(retry_interval).await;
                    }
                },
            }
        }
    }

    /// Attempt to connect to OpenSearch.
    ///
    /// Creating the client does not touch the network, so an index-exists check
    /// confirms the server is reachable.
    async fn try_connect_opensearch(
        config: &OpenSearchConfig,
        index: &str,
    ) -> Result<OpenSearchProvider, AppError> {
        let search_provider = OpenSearchProvider::new(config).await.map_err(|e| {
            AppError::config(format!("Failed to create OpenSearch provider: {}", e))
        })?;

        search_provider
            .index_exists(index)
            .await
            .map_err(|e| AppError::config(format!("OpenSearch is not reachable: {}", e)))?;

        Ok(search_provider)
    }
}
