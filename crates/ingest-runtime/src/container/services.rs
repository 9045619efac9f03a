//! # Service Container
//!
//! Holds the shared services every pipeline and HTTP handler uses.
//!
//! ```text
//!                 ┌──────────────┐
//!  pipelines ───→ │ StoreWriter  │ ←── /events/recent, /health, stats report
//!      │          └──────────────┘
//!      │ publish  ┌──────────────┐  relay   ┌───────────────┐
//!      └────────→ │  Flush Bus   │ ───────→ │ BroadcastHub  │ ←── /ws
//!                 └──────────────┘          └───────────────┘
//! ```
//!
//! All services are `Send + Sync` and shared through `Arc`.

use std::sync::Arc;

use ev_01_store_writer::{BulkStore, DocumentWriter, StoreWriter};
use ev_02_broadcast_hub::BroadcastHub;
use ev_03_ingestion::{IngestStats, IngestionPipeline, LogConsumer};
use shared_bus::{EventPublisher, InMemoryEventBus};
use tracing::info;

use crate::container::config::IngestConfig;

pub struct IngestContainer<S: BulkStore + 'static> {
    pub config: IngestConfig,
    pub writer: Arc<StoreWriter<S>>,
    pub hub: Arc<BroadcastHub>,
    pub bus: Arc<InMemoryEventBus>,
    pub stats: Arc<IngestStats>,
}

impl<S: BulkStore + 'static> IngestContainer<S> {
    pub fn new(config: IngestConfig, store: S) -> Self {
        let writer = Arc::new(StoreWriter::new(store, config.writer_config()));
        let hub = Arc::new(BroadcastHub::new(config.hub.clone()));
        Self {
            config,
            writer,
            hub,
            bus: Arc::new(InMemoryEventBus::new()),
            stats: Arc::new(IngestStats::new()),
        }
    }

    /// One pipeline per consumer, all sharing writer, bus and counters.
    pub fn pipelines<C: LogConsumer>(
        &self,
        consumers: Vec<C>,
    ) -> Vec<Arc<IngestionPipeline<C>>> {
        let pipelines: Vec<_> = consumers
            .into_iter()
            .enumerate()
            .map(|(instance, consumer)| {
                let writer: Arc<dyn DocumentWriter> = self.writer.clone();
                let publisher: Arc<dyn EventPublisher> = self.bus.clone();
                Arc::new(IngestionPipeline::new(
                    format!("pipeline-{}", instance),
                    consumer,
                    writer,
                    publisher,
                    self.stats.clone(),
                    self.config.pipeline.clone(),
                ))
            })
            .collect();
        info!(count = pipelines.len(), "Pipelines created");
        pipelines
    }
}
