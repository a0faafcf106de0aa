//! OpenSearch index configuration and mappings.
//!
//! This module defines the index settings and mappings for the orders search index.

use serde_json::{json, Value};

use crate::types::{IndexSchema, SchemaMigration, SCHEMA_VERSION_KEY};

/// The default name of the orders index.
pub const INDEX_NAME: &str = "orders";

/// Schema version of `orders_index_schema`, stamped into the mapping `_meta`.
///
/// Bump together with a new `orders_analysis_migration` whenever the analysis or
/// mappings change.
pub const ORDERS_SCHEMA_VERSION: u32 = 1;

/// Analyzers and normalizers shared by index creation and migration.
///
/// - **keyword_analyzer**: standard tokenizer, lowercased
/// - **ngram_analyzer**: ngram tokenizer, lowercased (substring matching on `keywordSearch`)
/// - **lowercase** normalizer: for case-insensitive `.keyword` sub-fields
fn orders_analysis() -> Value {
    json!({
        "analyzer": {
            "keyword_analyzer": {
                "type": "custom",
                "tokenizer": "standard",
                "filter": ["lowercase"]
            },
            "ngram_analyzer": {
                "type": "custom",
                "tokenizer": "ngram",
                "filter": ["lowercase"]
            }
        },
        "normalizer": {
            "lowercase": {
                "type": "custom",
                "filter": ["lowercase"]
            }
        }
    })
}

/// A text field analyzed with `keyword_analyzer` and a lowercased `.keyword` sub-field.
fn searchable_text_field() -> Value {
    json!({
        "type": "text",
        "analyzer": "keyword_analyzer",
        "search_analyzer": "standard",
        "fields": {
            "keyword": {
                "type": "keyword",
                "normalizer": "lowercase"
            }
        }
    })
}

/// Get the index settings and mappings for the orders search index.
///
/// The configuration includes:
/// - **Keyword fields**: `orderId`, `sellerId`, `sellerEmail` for exact filtering and sorting
/// - **Searchable text**: `orderNameXPwId`, `shippingName` with case-insensitive `.keyword` sub-fields
/// - **keywordSearch**: ngram-analyzed free-text field
///
/// # Sharding Configuration
///
/// - 1 primary shard
/// - 0 replicas
pub fn orders_index_schema() -> IndexSchema {
    IndexSchema {
        settings: json!({
            "number_of_shards": 1,
            "number_of_replicas": 0,
            "analysis": orders_analysis()
        }),
        mappings: json!({
            "_meta": { SCHEMA_VERSION_KEY: ORDERS_SCHEMA_VERSION },
            "properties": {
                "orderId": { "type": "keyword" },
                "orderNameXPwId": searchable_text_field(),
                "sellerId": { "type": "keyword" },
                "sellerEmail": { "type": "keyword" },
                "shippingName": searchable_text_field(),
                "keywordSearch": { "type": "text", "analyzer": "ngram_analyzer" }
            }
        }),
    }
}

/// Additions applied to an orders index created before the searchable sub-fields existed.
pub fn orders_analysis_migration() -> SchemaMigration {
    SchemaMigration {
        version: ORDERS_SCHEMA_VERSION,
        analysis: orders_analysis(),
        mappings: json!({
            "properties": {
                "orderNameXPwId": searchable_text_field(),
                "shippingName": searchable_text_field()
            }
        }),
    }
}
