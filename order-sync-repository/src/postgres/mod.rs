//! PostgreSQL implementation of the source store.

mod source_store;

pub use source_store::PostgresSourceStore;
