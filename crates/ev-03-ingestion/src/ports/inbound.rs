//! # Inbound Ports
//!
//! How the runtime drives a pipeline without knowing its broker.

use async_trait::async_trait;

use crate::domain::{PipelineError, StatsSnapshot};

#[async_trait]
pub trait IngestionApi: Send + Sync {
    /// Consume until stopped or until a batch fails.
    async fn run(&self) -> Result<(), PipelineError>;

    /// Ask `run` to return once the in-flight batch is done.
    fn stop(&self);

    fn stats(&self) -> StatsSnapshot;
}
