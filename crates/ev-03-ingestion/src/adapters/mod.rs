//! Adapters for the ingestion pipeline.

#[cfg(feature = "kafka")]
pub mod kafka;

#[cfg(feature = "kafka")]
pub use kafka::{KafkaConfig, KafkaLogConsumer};
