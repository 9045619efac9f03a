//! # Outbound Ports (Driven Ports)
//!
//! One method per store request. Adapters do not retry; the writer does.

use async_trait::async_trait;
use serde_json::Value;
use shared_types::ProcessedEvent;

use crate::domain::{BulkItemResult, ClusterStatus, StoreError};

/// A search store that accepts tagged documents in bulk.
#[async_trait]
pub trait BulkStore: Send + Sync {
    async fn index_exists(&self, index: &str) -> Result<bool, StoreError>;

    /// Install or replace a lifecycle policy.
    async fn put_lifecycle_policy(&self, name: &str, policy: &Value) -> Result<(), StoreError>;

    /// Create an index. Fails with `AlreadyExists` if it is already there.
    async fn create_index(&self, index: &str, definition: &Value) -> Result<(), StoreError>;

    /// Index `documents` under their `eventId`.
    ///
    /// Returns one result per document, in order.
    async fn bulk_index(
        &self,
        index: &str,
        documents: &[ProcessedEvent],
    ) -> Result<Vec<BulkItemResult>, StoreError>;

    async fn count(&self, index: &str) -> Result<u64, StoreError>;

    /// Run a search request body and return the matching documents.
    async fn search(&self, index: &str, body: &Value) -> Result<Vec<ProcessedEvent>, StoreError>;

    async fn cluster_health(&self) -> Result<ClusterStatus, StoreError>;
}
