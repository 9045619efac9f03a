//! # Inbound Ports (Driving Ports)

use async_trait::async_trait;
use shared_types::ProcessedEvent;

use crate::domain::{WriteOutcome, WriterError};

/// Durable, idempotent document writes.
///
/// Documents are addressed by `eventId`: writing the same id again replaces
/// the stored document.
#[async_trait]
pub trait DocumentWriter: Send + Sync {
    /// Write a batch. Per-document refusals are reported in the outcome;
    /// `Err` means nothing in the batch can be assumed durable.
    async fn write(&self, batch: &[ProcessedEvent]) -> Result<WriteOutcome, WriterError>;
}
