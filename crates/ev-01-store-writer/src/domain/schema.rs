//! # Index Schema and Retention
//!
//! The index is created once per deployment with a strict mapping: only
//! `properties` accepts new keys, and no value is coerced into a field type.
//!
//! Retention runs through a lifecycle policy:
//!
//! | Phase  | Age     | Actions                                        |
//! |--------|---------|------------------------------------------------|
//! | hot    | 0       | rollover at 1d or 50gb primary shard, prio 100 |
//! | warm   | 7d      | shrink to 1 shard, force-merge to 1 segment    |
//! | delete | 30d     | delete                                         |

use serde_json::{json, Value};

/// Default index name.
pub const DEFAULT_INDEX: &str = "analytics-events";

/// Name of the lifecycle policy attached to the index.
pub const LIFECYCLE_POLICY_NAME: &str = "analytics-lifecycle";

/// Lifecycle policy body (the value of the `policy` key).
#[must_use]
pub fn lifecycle_policy() -> Value {
    json!({
        "phases": {
            "hot": {
                "actions": {
                    "rollover": {
                        "max_age": "1d",
                        "max_primary_shard_size": "50gb"
                    },
                    "set_priority": { "priority": 100 }
                }
            },
            "warm": {
                "min_age": "7d",
                "actions": {
                    "shrink": { "number_of_shards": 1 },
                    "forcemerge": { "max_num_segments": 1 },
                    "set_priority": { "priority": 50 }
                }
            },
            "delete": {
                "min_age": "30d",
                "actions": { "delete": {} }
            }
        }
    })
}

/// Settings and mappings used to create the index.
#[must_use]
pub fn index_definition() -> Value {
    json!({
        "settings": {
            "number_of_shards": 3,
            "number_of_replicas": 1,
            "refresh_interval": "1s",
            "index.mapping.coerce": false
        },
        "mappings": {
            "dynamic": "strict",
            "properties": {
                "eventId": { "type": "keyword" },
                "userId": { "type": "long" },
                "sessionId": { "type": "keyword" },
                "eventType": { "type": "keyword" },
                "timestamp": {
                    "type": "date",
                    "format": "strict_date_optional_time||epoch_millis"
                },
                "properties": { "type": "object", "dynamic": true },
                "metadata": {
                    "properties": {
                        "source": { "type": "keyword" },
                        "version": { "type": "keyword" },
                        "processedAt": { "type": "date" }
                    }
                },
                "indexedAt": { "type": "date" },
                "processingTimeMs": { "type": "integer" }
            }
        }
    })
}

/// Query body for the newest documents matching `query`.
#[must_use]
pub fn newest_first(query: Value, size: usize) -> Value {
    json!({
        "query": query,
        "size": size,
        "sort": [{ "timestamp": "desc" }]
    })
}
