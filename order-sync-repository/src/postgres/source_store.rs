//! PostgreSQL implementation of the source store.
//!
//! Reads records from a single table holding a key column and a JSONB payload
//! column. Queries are read-only and take no locks, so a sync never blocks the
//! primary's regular traffic.

use async_trait::async_trait;
use order_sync_shared::SourceRecord;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::Row;
use tracing::debug;

use crate::config::SourceTableConfig;
use crate::errors::SourceStoreError;
use crate::interfaces::SourceStore;
use crate::types::SourceFilter;
use crate::utils::validate_identifier;

/// PostgreSQL-backed source store.
pub struct PostgresSourceStore {
    /// PostgreSQL connection pool
    pool: sqlx::PgPool,
    table: SourceTableConfig,
}

impl PostgresSourceStore {
    /// Creates a new PostgreSQL source store.
    ///
    /// # Arguments
    ///
    /// * `pool` - Configured PostgreSQL connection pool
    /// * `table` - Table and column names to read from
    ///
    /// # Returns
    ///
    /// * `Ok(PostgresSourceStore)` - Ready-to-use store
    /// * `Err(SourceStoreError)` - If a table or column name is not a plain identifier
    pub fn new(pool: sqlx::PgPool, table: SourceTableConfig) -> Result<Self, SourceStoreError> {
        table.validate()?;
        Ok(Self { pool, table })
    }

    /// The underlying pool, so that callers can close it on shutdown.
    pub fn pool(&self) -> &sqlx::PgPool {
        &self.pool
    }

    fn count_sql(&self) -> String {
        format!(
            "SELECT COUNT(*) FROM {table} WHERE {data} @> $1",
            table = self.table.table,
            data = self.table.data_column,
        )
    }

    fn page_sql(&self, sort_key: &str) -> String {
        format!(
            "SELECT {key}::text AS key, {data} AS data FROM {table} WHERE {data} @> $1 ORDER BY {sort} ASC OFFSET $2 LIMIT $3",
            key = self.table.key_column,
            data = self.table.data_column,
            table = self.table.table,
            sort = sort_key,
        )
    }
}

fn to_i64(name: &str, value: u64) -> Result<i64, SourceStoreError> {
    i64::try_from(value)
        .map_err(|_| SourceStoreError::validation(format!("{} {} is out of range", name, value)))
}

#[async_trait]
impl SourceStore for PostgresSourceStore {
    async fn count(&self, filter: &SourceFilter) -> Result<u64, SourceStoreError> {
        let count: i64 = sqlx::query_scalar(&self.count_sql())
            .bind(Json(filter.as_value()))
            .fetch_one(&self.pool)
            .await?;

        u64::try_from(count)
            .map_err(|_| SourceStoreError::decode(format!("negative row count {}", count)))
    }

    async fn page(
        &self,
        filter: &SourceFilter,
        skip: u64,
        limit: u64,
        sort_key: &str,
    ) -> Result<Vec<SourceRecord>, SourceStoreError> {
        validate_identifier("sort key", sort_key)?;

        let rows = sqlx::query(&self.page_sql(sort_key))
            .bind(Json(filter.as_value()))
            .bind(to_i64("skip", skip)?)
            .bind(to_i64("limit", limit)?)
            .fetch_all(&self.pool)
            .await?;

        let records = rows
            .iter()
            .map(|row| {
                let key: String = row
                    .try_get("key")
                    .map_err(|e| SourceStoreError::decode(e.to_string()))?;
                let Json(data): Json<Value> = row
                    .try_get("data")
                    .map_err(|e| SourceStoreError::decode(e.to_string()))?;
                Ok(SourceRecord::new(key, data))
            })
            .collect::<Result<Vec<_>, SourceStoreError>>()?;

        debug!(skip, limit, fetched = records.len(), "Read source page");
        Ok(records)
    }
}
