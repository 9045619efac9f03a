//! Shared builders for the integration scenarios.

use std::sync::Arc;
use std::time::Duration;

use ev_01_store_writer::{InMemoryStore, RetryPolicy, StoreWriter, WriterConfig, DEFAULT_INDEX};
use ev_02_broadcast_hub::Frame;
use ev_03_ingestion::test_utils::{valid_payload, RecordingWriter, ScriptedConsumer};
use ev_03_ingestion::{transform, IngestStats, IngestionPipeline, PipelineConfig};
use shared_bus::InMemoryEventBus;
use shared_types::{ProcessedEvent, RawEvent, StreamMessage};
use tokio::sync::mpsc;

pub const TOPIC: &str = "analytics-events";

/// A processed event with id `evt-{n}`.
pub fn processed(n: usize) -> Arc<ProcessedEvent> {
    let raw = RawEvent::from_json_bytes(&valid_payload(n)).expect("fixture payload is valid");
    Arc::new(transform(raw))
}

/// Decode a hub frame; panics on anything but an `event` frame.
pub fn event_id(frame: &Frame) -> String {
    match serde_json::from_str::<StreamMessage>(frame).expect("frame is JSON") {
        StreamMessage::Event(event) => event.event_id,
        other => panic!("expected event frame, got {:?}", other),
    }
}

/// Everything currently queued in `outbox`.
pub fn drain(outbox: &mut mpsc::Receiver<Frame>) -> Vec<String> {
    let mut ids = Vec::new();
    while let Ok(frame) = outbox.try_recv() {
        ids.push(event_id(&frame));
    }
    ids
}

/// Poll `condition` every millisecond until it holds or `limit` passes.
pub async fn eventually<F: Fn() -> bool>(limit: Duration, condition: F) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    condition()
}

/// Pipeline on a scripted consumer and an in-memory store.
pub struct PipelineHarness {
    pub consumer: ScriptedConsumer,
    pub store: InMemoryStore,
    pub writer: Arc<RecordingWriter>,
    pub bus: Arc<InMemoryEventBus>,
    pub stats: Arc<IngestStats>,
    pub pipeline: Arc<IngestionPipeline<ScriptedConsumer>>,
}

impl PipelineHarness {
    pub fn new(flush_threshold: usize) -> Self {
        let consumer = ScriptedConsumer::new();
        let store = InMemoryStore::new();
        let inner = StoreWriter::new(
            store.clone(),
            WriterConfig {
                index: DEFAULT_INDEX.to_string(),
                retry: RetryPolicy::none(),
            },
        );
        let writer = Arc::new(RecordingWriter::new(Arc::new(inner)));
        let bus = Arc::new(InMemoryEventBus::new());
        let stats = Arc::new(IngestStats::new());
        let pipeline = Arc::new(IngestionPipeline::new(
            "pipeline-test",
            consumer.clone(),
            writer.clone(),
            bus.clone(),
            stats.clone(),
            PipelineConfig::default().with_flush_threshold(flush_threshold),
        ));
        Self {
            consumer,
            store,
            writer,
            bus,
            stats,
            pipeline,
        }
    }

    pub fn documents(&self) -> usize {
        self.store.document_total(DEFAULT_INDEX)
    }
}
