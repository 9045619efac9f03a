//! # Store Writer Service
//!
//! Wraps a `BulkStore` behind an idempotent write, plus index provisioning
//! and the read operations the runtime needs.
//!
//! ## Retry
//!
//! Every store request goes through the same schedule: retryable failures
//! (connectivity, timeout, 5xx, 429) are repeated with exponential backoff
//! until `max_retries` is exhausted; anything else surfaces immediately.

use async_trait::async_trait;
use serde_json::Value;
use shared_types::ProcessedEvent;
use std::future::Future;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::domain::{
    index_definition, lifecycle_policy, newest_first, StoreError, WriteOutcome, WriterConfig,
    WriterError, LIFECYCLE_POLICY_NAME,
};
use crate::ports::{BulkStore, DocumentWriter};

/// The Store Writer.
pub struct StoreWriter<S: BulkStore> {
    store: S,
    config: WriterConfig,
}

impl<S: BulkStore> StoreWriter<S> {
    pub fn new(store: S, config: WriterConfig) -> Self {
        Self { store, config }
    }

    /// Target index name.
    pub fn index(&self) -> &str {
        &self.config.index
    }

    /// The underlying store adapter.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run `call` under the retry policy.
    ///
    /// On failure returns the last error and the number of attempts made.
    async fn with_retry<T, F, Fut>(
        &self,
        operation: &'static str,
        mut call: F,
    ) -> Result<T, (StoreError, u32)>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt <= self.config.retry.max_retries => {
                    let delay = self.config.retry.backoff(attempt);
                    warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Store request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err((e, attempt)),
            }
        }
    }

    /// Provision the lifecycle policy and the index if the index is missing.
    ///
    /// Idempotent. Losing a creation race to another instance is success.
    pub async fn initialize(&self) -> Result<(), WriterError> {
        let index = self.config.index.as_str();

        let exists = self
            .with_retry("index_exists", || self.store.index_exists(index))
            .await
            .map_err(|(e, _)| WriterError::Initialization(e))?;
        if exists {
            debug!(index, "Index already present");
            return Ok(());
        }

        let policy = lifecycle_policy();
        self.with_retry("put_lifecycle_policy", || {
            self.store.put_lifecycle_policy(LIFECYCLE_POLICY_NAME, &policy)
        })
        .await
        .map_err(|(e, _)| WriterError::Initialization(e))?;

        let definition = index_definition();
        match self
            .with_retry("create_index", || self.store.create_index(index, &definition))
            .await
        {
            Ok(()) => info!(index, policy = LIFECYCLE_POLICY_NAME, "Index created"),
            Err((StoreError::AlreadyExists(_), _)) => {
                info!(index, "Index created concurrently by another instance")
            }
            Err((e, _)) => return Err(WriterError::Initialization(e)),
        }

        Ok(())
    }

    /// Write a batch, addressed by `eventId`.
    pub async fn write(&self, batch: &[ProcessedEvent]) -> Result<WriteOutcome, WriterError> {
        if batch.is_empty() {
            return Ok(WriteOutcome::empty());
        }

        let started = Instant::now();
        let items = self
            .with_retry("bulk_index", || {
                self.store.bulk_index(&self.config.index, batch)
            })
            .await
            .map_err(|(source, attempts)| WriterError::WriteFailed {
                documents: batch.len(),
                attempts,
                source,
            })?;

        let outcome = WriteOutcome::from_items(&items, started.elapsed().as_millis() as u64);

        if let Some(first) = outcome.failures.first() {
            warn!(
                index = %self.config.index,
                failed = outcome.failed,
                first_event_id = %first.event_id,
                first_reason = %first.reason,
                "Bulk write completed with document failures"
            );
        }
        debug!(
            index = %self.config.index,
            successful = outcome.successful,
            failed = outcome.failed,
            took_ms = outcome.elapsed_ms,
            "Bulk write completed"
        );

        Ok(outcome)
    }

    /// Number of documents in the index.
    pub async fn document_count(&self) -> Result<u64, WriterError> {
        self.with_retry("count", || self.store.count(&self.config.index))
            .await
            .map_err(|(e, _)| WriterError::Query(e))
    }

    /// Documents matching `query`, newest `timestamp` first.
    pub async fn search(
        &self,
        query: Value,
        size: usize,
    ) -> Result<Vec<ProcessedEvent>, WriterError> {
        let body = newest_first(query, size);
        self.with_retry("search", || self.store.search(&self.config.index, &body))
            .await
            .map_err(|(e, _)| WriterError::Query(e))
    }

    /// False when the cluster is red or cannot be reached.
    pub async fn health_check(&self) -> bool {
        match self.store.cluster_health().await {
            Ok(status) => status.is_serving(),
            Err(e) => {
                warn!(error = %e, "Store health check failed");
                false
            }
        }
    }
}

#[async_trait]
impl<S: BulkStore> DocumentWriter for StoreWriter<S> {
    async fn write(&self, batch: &[ProcessedEvent]) -> Result<WriteOutcome, WriterError> {
        StoreWriter::write(self, batch).await
    }
}
