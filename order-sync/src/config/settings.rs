//! Settings read from the environment.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use crate::exporter::ExportConfig;
use crate::orchestrator::SyncConfig;
use crate::AppError;
use order_sync_repository::opensearch::INDEX_NAME;
use order_sync_repository::{OpenSearchConfig, SourceFilter, SourceTableConfig};

/// Default OpenSearch URL.
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Default connection retry interval in seconds.
const DEFAULT_RETRY_INTERVAL_SECS: u64 = 15;

/// Default PostgreSQL pool size.
const DEFAULT_PG_MAX_CONNECTIONS: u32 = 5;

/// Connection mode for OpenSearch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Fail immediately if connection fails.
    FailFast,
    /// Retry connection every retry interval until successful.
    Retry,
}

impl ConnectionMode {
    /// Parse a connection mode.
    ///
    /// Valid values: "fail-fast" or "retry" (case-insensitive).
    /// Defaults to "retry" if not set or invalid.
    fn parse(value: Option<&str>) -> Self {
        match value.unwrap_or("retry").to_lowercase().as_str() {
            "fail-fast" | "failfast" | "fail_fast" => Self::FailFast,
            "retry" => Self::Retry,
            _ => {
                warn!("Invalid OPENSEARCH_CONNECTION_MODE, defaulting to 'retry'");
                Self::Retry
            }
        }
    }
}

/// Everything the binary needs to build its dependencies.
///
/// `Debug` output redacts the database URL and the OpenSearch password.
#[derive(Clone)]
pub struct SyncSettings {
    pub opensearch: OpenSearchConfig,
    pub connection_mode: ConnectionMode,
    pub retry_interval: Duration,
    pub database_url: String,
    pub pg_max_connections: u32,
    pub source_table: SourceTableConfig,
    pub sync: SyncConfig,
    pub export: ExportConfig,
}

impl fmt::Debug for SyncSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncSettings")
            .field("opensearch", &self.opensearch)
            .field("connection_mode", &self.connection_mode)
            .field("retry_interval", &self.retry_interval)
            .field("database_url", &"<redacted>")
            .field("pg_max_connections", &self.pg_max_connections)
            .field("source_table", &self.source_table)
            .field("sync", &self.sync)
            .field("export", &self.export)
            .finish()
    }
}

impl SyncSettings {
    /// Read settings from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    /// - `OPENSEARCH_USERNAME` / `OPENSEARCH_PASSWORD`: Basic auth (default: none)
    /// - `OPENSEARCH_CONNECTION_MODE`: "fail-fast" or "retry" (default: retry)
    /// - `OPENSEARCH_RETRY_INTERVAL_SECS`: Retry interval in seconds (default: 15)
    /// - `DATABASE_URL`: PostgreSQL connection string (required)
    /// - `PG_MAX_CONNECTIONS`: Pool size (default: 5)
    /// - `SOURCE_TABLE` / `SOURCE_KEY_COLUMN` / `SOURCE_DATA_COLUMN`: Source layout (default: orders / id / data)
    /// - `INDEX_NAME`: Target index (default: orders)
    /// - `SYNC_PAGE_SIZE`: Records per source page (default: 100000)
    /// - `SYNC_SUB_BATCH_SIZE`: Records per bulk call (default: 1000)
    /// - `SYNC_MAX_CONCURRENT_BATCHES`: Bulk calls in flight (default: 4)
    /// - `SYNC_FLUSH_EVERY_PAGES`: Flush interval in pages (default: 1)
    /// - `SYNC_MIGRATE_EXISTING`: Migrate an existing index before syncing (default: true)
    /// - `EXPORT_PAGE_SIZE`: Hits per export request (default: 5000)
    ///
    /// # Returns
    ///
    /// * `Ok(SyncSettings)` - Validated settings
    /// * `Err(AppError)` - If a required variable is missing or a value is invalid
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read settings through `lookup`, which returns a variable's value if set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let mut opensearch = OpenSearchConfig::new(
            lookup("OPENSEARCH_URL").unwrap_or_else(|| DEFAULT_OPENSEARCH_URL.to_string()),
        );
        if let (Some(username), Some(password)) =
            (lookup("OPENSEARCH_USERNAME"), lookup("OPENSEARCH_PASSWORD"))
        {
            opensearch = opensearch.with_basic_auth(username, password);
        }

        let connection_mode =
            ConnectionMode::parse(lookup("OPENSEARCH_CONNECTION_MODE").as_deref());
        let retry_interval = Duration::from_secs(parse_or(
            &lookup,
            "OPENSEARCH_RETRY_INTERVAL_SECS",
            DEFAULT_RETRY_INTERVAL_SECS,
        )?);

        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.is_empty())
            .ok_or_else(|| AppError::config("DATABASE_URL must be set"))?;
        let pg_max_connections = parse_or(&lookup, "PG_MAX_CONNECTIONS", DEFAULT_PG_MAX_CONNECTIONS)?;
        if pg_max_connections == 0 {
            return Err(AppError::config("PG_MAX_CONNECTIONS must be greater than zero"));
        }

        let defaults = SourceTableConfig::default();
        let source_table = SourceTableConfig {
            table: lookup("SOURCE_TABLE").unwrap_or(defaults.table),
            key_column: lookup("SOURCE_KEY_COLUMN").unwrap_or(defaults.key_column),
            data_column: lookup("SOURCE_DATA_COLUMN").unwrap_or(defaults.data_column),
        };
        source_table
            .validate()
            .map_err(|e| AppError::config(e.to_string()))?;

        let index = lookup("INDEX_NAME").unwrap_or_else(|| INDEX_NAME.to_string());

        let sync_defaults = SyncConfig::default();
        let sync = SyncConfig {
            index: index.clone(),
            page_size: parse_or(&lookup, "SYNC_PAGE_SIZE", sync_defaults.page_size)?,
            sub_batch_size: parse_or(&lookup, "SYNC_SUB_BATCH_SIZE", sync_defaults.sub_batch_size)?,
            max_concurrent_batches: parse_or(
                &lookup,
                "SYNC_MAX_CONCURRENT_BATCHES",
                sync_defaults.max_concurrent_batches,
            )?,
            flush_every_pages: parse_or(
                &lookup,
                "SYNC_FLUSH_EVERY_PAGES",
                sync_defaults.flush_every_pages,
            )?,
            sort_key: source_table.key_column.clone(),
            filter: SourceFilter::all(),
            migrate_existing: parse_or(
                &lookup,
                "SYNC_MIGRATE_EXISTING",
                sync_defaults.migrate_existing,
            )?,
        };
        sync.validate()?;

        let export_defaults = ExportConfig::default();
        let export = ExportConfig {
            index,
            page_size: parse_or(&lookup, "EXPORT_PAGE_SIZE", export_defaults.page_size)?,
            ..export_defaults
        };
        export.validate()?;

        Ok(Self {
            opensearch,
            connection_mode,
            retry_interval,
            database_url,
            pg_max_connections,
            source_table,
            sync,
            export,
        })
    }
}

/// Parse `name` if set, otherwise use `default`.
fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| AppError::config(format!("Invalid {} '{}': {}", name, raw, e))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings =
            SyncSettings::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/shop")]))
                .unwrap();

        assert_eq!(settings.opensearch.url, "http://localhost:9200");
        assert!(settings.opensearch.credentials().is_none());
        assert_eq!(settings.connection_mode, ConnectionMode::Retry);
        assert_eq!(settings.retry_interval, Duration::from_secs(15));
        assert_eq!(settings.pg_max_connections, 5);
        assert_eq!(settings.source_table, SourceTableConfig::default());
        assert_eq!(settings.sync.index, "orders");
        assert_eq!(settings.sync.page_size, 100_000);
        assert_eq!(settings.sync.sub_batch_size, 1000);
        assert_eq!(settings.sync.max_concurrent_batches, 4);
        assert_eq!(settings.sync.flush_every_pages, 1);
        assert_eq!(settings.sync.sort_key, "id");
        assert!(settings.sync.migrate_existing);
        assert_eq!(settings.export.page_size, 5000);
        assert_eq!(settings.export.index, "orders");
    }

    #[test]
    fn test_overrides() {
        let settings = SyncSettings::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/shop"),
            ("OPENSEARCH_USERNAME", "admin"),
            ("OPENSEARCH_PASSWORD", "secret"),
            ("OPENSEARCH_CONNECTION_MODE", "FAIL-FAST"),
            ("SOURCE_KEY_COLUMN", "order_id"),
            ("INDEX_NAME", "orders_v2"),
            ("SYNC_PAGE_SIZE", "1000"),
            ("SYNC_MIGRATE_EXISTING", "false"),
        ]))
        .unwrap();

        assert_eq!(settings.opensearch.credentials(), Some(("admin", "secret")));
        assert_eq!(settings.connection_mode, ConnectionMode::FailFast);
        assert_eq!(settings.sync.sort_key, "order_id");
        assert_eq!(settings.sync.index, "orders_v2");
        assert_eq!(settings.export.index, "orders_v2");
        assert_eq!(settings.sync.page_size, 1000);
        assert!(!settings.sync.migrate_existing);
    }

    #[test]
    fn test_debug_hides_credentials() {
        let settings = SyncSettings::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://sync:pg-secret@db/shop"),
            ("OPENSEARCH_USERNAME", "admin"),
            ("OPENSEARCH_PASSWORD", "os-secret"),
        ]))
        .unwrap();

        let output = format!("{:?}", settings);
        assert!(!output.contains("pg-secret"));
        assert!(!output.contains("os-secret"));
        assert!(output.contains("admin"));
        assert!(output.contains("orders"));
    }

    #[test]
    fn test_missing_database_url() {
        let result = SyncSettings::from_lookup(lookup(&[]));
        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        for (name, value) in [
            ("SYNC_PAGE_SIZE", "lots"),
            ("SYNC_PAGE_SIZE", "0"),
            ("SYNC_SUB_BATCH_SIZE", "-1"),
            ("EXPORT_PAGE_SIZE", "0"),
            ("PG_MAX_CONNECTIONS", "0"),
        ] {
            let result = SyncSettings::from_lookup(lookup(&[
                ("DATABASE_URL", "postgres://localhost/shop"),
                (name, value),
            ]));
            assert!(result.is_err(), "{name}={value}");
        }
    }

    #[test]
    fn test_invalid_table_name() {
        let result = SyncSettings::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/shop"),
            ("SOURCE_TABLE", "orders; --"),
        ]));
        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }

    #[test]
    fn test_unknown_connection_mode_defaults_to_retry() {
        assert_eq!(ConnectionMode::parse(Some("sometimes")), ConnectionMode::Retry);
        assert_eq!(ConnectionMode::parse(None), ConnectionMode::Retry);
    }
}
