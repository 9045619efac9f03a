//! # Pipeline Errors

use ev_01_store_writer::WriterError;
use thiserror::Error;

/// Failure talking to the log broker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    #[error("Consumer setup failed: {0}")]
    Setup(String),

    #[error("Subscription failed: {0}")]
    Subscribe(String),

    #[error("Receive failed: {0}")]
    Receive(String),

    #[error("Heartbeat failed: {0}")]
    Heartbeat(String),

    #[error("Offset commit failed: {0}")]
    Commit(String),
}

/// Why a pipeline stopped consuming.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("Log broker error: {0}")]
    Broker(#[from] BrokerError),

    /// The batch was not committed and will be redelivered.
    #[error("Window write failed: {0}")]
    Store(#[from] WriterError),
}
