//! # Outbound Ports
//!
//! What the pipeline needs from the log broker. Writing goes through
//! `ev_01_store_writer::DocumentWriter`, flush notifications through
//! `shared_bus::EventPublisher`.

use async_trait::async_trait;
use shared_bus::PartitionOffset;

use crate::domain::{BrokerError, MessageBatch};

/// A consumer-group member on the log.
#[async_trait]
pub trait LogConsumer: Send + Sync {
    /// Join the group and start from the group's committed position
    /// (latest when the group has none).
    async fn subscribe(&self) -> Result<(), BrokerError>;

    /// Wait for the next batch.
    ///
    /// `Ok(None)` means nothing arrived within the consumer's batch wait.
    async fn next_batch(&self) -> Result<Option<MessageBatch>, BrokerError>;

    /// Renew the session lease while a long batch is being processed.
    async fn heartbeat(&self) -> Result<(), BrokerError>;

    /// Commit the given positions (next offset to read per partition).
    async fn commit(&self, offsets: &[PartitionOffset]) -> Result<(), BrokerError>;

    /// Leave the group.
    async fn disconnect(&self) -> Result<(), BrokerError>;
}
