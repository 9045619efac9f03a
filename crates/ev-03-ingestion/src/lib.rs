//! # Ingestion Pipeline (ev-03)
//!
//! At-least-once transfer of analytics events from the log into the store.
//!
//! ## Responsibilities
//!
//! - Parse and transform each log message, dropping malformed ones
//! - Write windows of processed events through `DocumentWriter`
//! - Commit a batch's offsets only after all of its windows were written
//! - Announce written windows and commits on the flush bus
//! - Keep process-wide ingestion counters
//!
//! ## Hexagonal Architecture
//!
//! - **Domain Layer** (`domain/`): transform, window, offsets, stats, errors
//! - **Ports Layer** (`ports/`): `IngestionApi` (inbound), `LogConsumer` (outbound)
//! - **Service** (`service.rs`): `IngestionPipeline`
//! - **Adapters Layer** (`adapters/`): Kafka consumer (feature `kafka`)

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

/// Test utilities (scripted consumer, recording writer, payload builders).
///
/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

#[cfg(feature = "kafka")]
pub use adapters::{KafkaConfig, KafkaLogConsumer};
pub use domain::{
    transform, BatchWindow, BrokerError, IngestStats, LogMessage, MessageBatch, OffsetTracker,
    PipelineConfig, PipelineError, StatsSnapshot, DEFAULT_FLUSH_THRESHOLD,
};
pub use ports::{IngestionApi, LogConsumer};
pub use service::{BatchReport, IngestionPipeline};
