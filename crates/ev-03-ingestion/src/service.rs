//! # Ingestion Pipeline Service
//!
//! One consumer-group member: receive batch → parse → transform → windowed
//! bulk writes → commit. Batches are handled strictly one at a time.
//!
//! ```text
//! next_batch ─→ for each message ─→ window full? ─→ flush + heartbeat
//!                                                │
//!                end of batch ─→ flush rest ─→ commit ─→ BatchCommitted
//! ```
//!
//! A message is resolved once it is in a window that was written, or once it
//! was dropped as malformed. Offsets are committed only after every window of
//! the batch was written, so a failed write leaves the whole batch to be
//! redelivered.

use async_trait::async_trait;
use ev_01_store_writer::DocumentWriter;
use shared_bus::{EventPublisher, IngestEvent};
use shared_types::RawEvent;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::domain::{
    transform, BatchWindow, IngestStats, MessageBatch, OffsetTracker, PipelineConfig,
    PipelineError, StatsSnapshot,
};
use crate::ports::{IngestionApi, LogConsumer};

/// Result of one processed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub messages: usize,
    pub windows: usize,
    pub malformed: usize,
    pub committed: bool,
}

pub struct IngestionPipeline<C: LogConsumer> {
    name: String,
    consumer: C,
    writer: Arc<dyn DocumentWriter>,
    publisher: Arc<dyn EventPublisher>,
    stats: Arc<IngestStats>,
    config: PipelineConfig,
    stop_tx: watch::Sender<bool>,
}

impl<C: LogConsumer> IngestionPipeline<C> {
    pub fn new(
        name: impl Into<String>,
        consumer: C,
        writer: Arc<dyn DocumentWriter>,
        publisher: Arc<dyn EventPublisher>,
        stats: Arc<IngestStats>,
        config: PipelineConfig,
    ) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            name: name.into(),
            consumer,
            writer,
            publisher,
            stats,
            config,
            stop_tx,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn consumer(&self) -> &C {
        &self.consumer
    }

    pub fn stats_handle(&self) -> Arc<IngestStats> {
        self.stats.clone()
    }

    /// Consume until [`IngestionPipeline::stop`] or a failed batch.
    pub async fn run(&self) -> Result<(), PipelineError> {
        let mut stop_rx = self.stop_tx.subscribe();

        self.consumer.subscribe().await?;
        info!(pipeline = %self.name, "Pipeline consuming");

        let result = self.consume(&mut stop_rx).await;

        if let Err(e) = &result {
            error!(pipeline = %self.name, error = %e, "Pipeline stopped on error");
            self.publisher
                .publish(IngestEvent::BatchFailed {
                    reason: e.to_string(),
                })
                .await;
        }

        if let Err(e) = self.consumer.disconnect().await {
            warn!(pipeline = %self.name, error = %e, "Disconnect from log failed");
        }
        info!(pipeline = %self.name, "Pipeline stopped");

        result
    }

    async fn consume(&self, stop_rx: &mut watch::Receiver<bool>) -> Result<(), PipelineError> {
        let mut receive_failures = 0u32;

        loop {
            if *stop_rx.borrow() {
                return Ok(());
            }

            let next = tokio::select! {
                biased;
                _ = stop_rx.changed() => return Ok(()),
                next = self.consumer.next_batch() => next,
            };

            match next {
                Ok(Some(batch)) => {
                    receive_failures = 0;
                    self.process_batch(batch).await?;
                }
                Ok(None) => receive_failures = 0,
                Err(e) => {
                    receive_failures += 1;
                    if receive_failures > self.config.max_receive_retries {
                        return Err(e.into());
                    }
                    let delay = self.config.receive_delay(receive_failures);
                    warn!(
                        pipeline = %self.name,
                        error = %e,
                        attempt = receive_failures,
                        delay_ms = delay.as_millis() as u64,
                        "Receive failed, retrying"
                    );
                    tokio::select! {
                        biased;
                        _ = stop_rx.changed() => return Ok(()),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    /// Process one batch to completion, commit included.
    pub async fn process_batch(&self, batch: MessageBatch) -> Result<BatchReport, PipelineError> {
        let mut report = BatchReport {
            messages: batch.len(),
            ..BatchReport::default()
        };
        let mut window = BatchWindow::new(self.config.flush_threshold);
        let mut offsets = OffsetTracker::new();

        for message in batch.messages {
            match message.payload.as_deref() {
                Some(payload) => match RawEvent::from_json_bytes(payload) {
                    Ok(raw) => {
                        window.push(transform(raw));
                        self.stats.record_processed();
                    }
                    Err(e) => {
                        report.malformed += 1;
                        self.stats.record_error();
                        warn!(
                            pipeline = %self.name,
                            topic = %message.topic,
                            partition = message.partition,
                            offset = message.offset,
                            error = %e,
                            "Dropping malformed message"
                        );
                    }
                },
                None => debug!(
                    pipeline = %self.name,
                    partition = message.partition,
                    offset = message.offset,
                    "Skipping tombstone"
                ),
            }
            offsets.resolve(&message.topic, message.partition, message.offset);

            if window.is_full() {
                self.flush(&mut window).await?;
                report.windows += 1;
                self.consumer.heartbeat().await?;
            }
        }

        if !window.is_empty() {
            self.flush(&mut window).await?;
            report.windows += 1;
        }

        if !offsets.is_empty() {
            let positions = offsets.commit_positions();
            self.consumer.commit(&positions).await?;
            debug!(pipeline = %self.name, offsets = ?positions, "Offsets committed");
            self.publisher
                .publish(IngestEvent::BatchCommitted { offsets: positions })
                .await;
            report.committed = true;
        }

        Ok(report)
    }

    async fn flush(&self, window: &mut BatchWindow) -> Result<(), PipelineError> {
        let documents = window.take();
        let outcome = self.writer.write(&documents).await?;

        self.stats.record_write(outcome.successful, outcome.failed);
        info!(
            pipeline = %self.name,
            indexed = outcome.successful,
            rejected = outcome.failed,
            took_ms = outcome.elapsed_ms,
            "Window flushed"
        );

        let confirmed = outcome.into_confirmed(documents);
        self.publisher
            .publish(IngestEvent::WindowIndexed {
                events: confirmed.into(),
                rejected: outcome.failed,
            })
            .await;

        Ok(())
    }

    /// Make `run` return once the in-flight batch is done.
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

#[async_trait]
impl<C: LogConsumer> IngestionApi for IngestionPipeline<C> {
    async fn run(&self) -> Result<(), PipelineError> {
        IngestionPipeline::run(self).await
    }

    fn stop(&self) {
        IngestionPipeline::stop(self);
    }

    fn stats(&self) -> StatsSnapshot {
        IngestionPipeline::stats(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BrokerError, LogMessage};
    use crate::test_utils::{
        batch_of, malformed_payload, valid_payload, valid_payloads, RecordingWriter,
        ScriptedConsumer,
    };
    use ev_01_store_writer::{
        InMemoryStore, RetryPolicy, StoreError, StoreOp, StoreWriter, WriterConfig,
        WriterError, DEFAULT_INDEX,
    };
    use shared_bus::{EventFilter, EventTopic, InMemoryEventBus};
    use std::time::Duration;

    const TOPIC: &str = "analytics-events";

    struct Harness {
        consumer: ScriptedConsumer,
        store: InMemoryStore,
        recorder: Arc<RecordingWriter>,
        bus: Arc<InMemoryEventBus>,
        pipeline: Arc<IngestionPipeline<ScriptedConsumer>>,
    }

    fn harness(threshold: usize) -> Harness {
        let consumer = ScriptedConsumer::new();
        let store = InMemoryStore::new();
        let writer = StoreWriter::new(
            store.clone(),
            WriterConfig {
                index: DEFAULT_INDEX.to_string(),
                retry: RetryPolicy::none(),
            },
        );
        let recorder = Arc::new(RecordingWriter::new(Arc::new(writer)));
        let bus = Arc::new(InMemoryEventBus::new());
        let pipeline = Arc::new(IngestionPipeline::new(
            "pipeline-0",
            consumer.clone(),
            recorder.clone(),
            bus.clone(),
            Arc::new(IngestStats::new()),
            PipelineConfig::default().with_flush_threshold(threshold),
        ));
        Harness {
            consumer,
            store,
            recorder,
            bus,
            pipeline,
        }
    }

    #[tokio::test]
    async fn test_250_events_flush_100_100_50_then_commit() {
        let h = harness(100);
        let report = h
            .pipeline
            .process_batch(batch_of(TOPIC, 0, 1000, valid_payloads(0, 250)))
            .await
            .unwrap();

        assert_eq!(h.recorder.windows(), vec![100, 100, 50]);
        assert_eq!(report.windows, 3);
        assert!(report.committed);
        assert_eq!(h.consumer.heartbeats(), 2);

        let commits = h.consumer.commits();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0][0].offset, 1250);
        assert_eq!(h.store.document_total(DEFAULT_INDEX), 250);

        let stats = h.pipeline.stats();
        assert_eq!(stats.processed, 250);
        assert_eq!(stats.indexed, 250);
        assert_eq!(stats.errors, 0);
    }

    #[tokio::test]
    async fn test_malformed_message_isolated_and_batch_committed() {
        let h = harness(100);
        let mut payloads = valid_payloads(0, 250);
        payloads[37] = malformed_payload();

        let report = h
            .pipeline
            .process_batch(batch_of(TOPIC, 0, 0, payloads))
            .await
            .unwrap();

        assert_eq!(report.malformed, 1);
        let stats = h.pipeline.stats();
        assert_eq!(stats.processed, 249);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.indexed, 249);
        assert_eq!(h.store.document_total(DEFAULT_INDEX), 249);
        assert!(h.store.document(DEFAULT_INDEX, "evt-37").is_none());
        assert_eq!(h.consumer.committed(TOPIC, 0), Some(250));
    }

    #[tokio::test]
    async fn test_failed_write_prevents_commit() {
        let h = harness(100);
        h.recorder.fail_write(1);

        let result = h
            .pipeline
            .process_batch(batch_of(TOPIC, 0, 0, valid_payloads(0, 250)))
            .await;

        assert!(matches!(result, Err(PipelineError::Store(_))));
        assert_eq!(h.recorder.windows(), vec![100, 100]);
        assert!(h.consumer.commits().is_empty());
    }

    #[tokio::test]
    async fn test_store_rejection_fails_batch() {
        let h = harness(10);
        h.store.fail_always(
            StoreOp::Bulk,
            StoreError::Rejected {
                status: 400,
                body: "illegal_argument_exception".to_string(),
            },
        );

        let result = h
            .pipeline
            .process_batch(batch_of(TOPIC, 0, 0, valid_payloads(0, 5)))
            .await;

        assert!(matches!(
            result,
            Err(PipelineError::Store(WriterError::WriteFailed { .. }))
        ));
        assert!(h.consumer.commits().is_empty());
    }

    #[tokio::test]
    async fn test_refused_documents_counted_and_not_published() {
        let h = harness(100);
        let mut sub = h.bus.subscribe(EventFilter::topics(vec![EventTopic::Indexed]));
        let mut payloads = valid_payloads(0, 4);
        payloads[2] = serde_json::json!({
            "eventId": "evt-text",
            "userId": "user_42",
            "sessionId": "s",
            "eventType": "search",
            "timestamp": "2024-05-01T10:00:00Z",
            "metadata": { "source": "api", "version": "1" }
        })
        .to_string()
        .into_bytes();

        h.pipeline
            .process_batch(batch_of(TOPIC, 0, 0, payloads))
            .await
            .unwrap();

        let stats = h.pipeline.stats();
        assert_eq!(stats.indexed, 3);
        assert_eq!(stats.rejected, 1);
        assert_eq!(h.consumer.committed(TOPIC, 0), Some(4));

        match sub.recv().await.unwrap() {
            IngestEvent::WindowIndexed { events, rejected } => {
                assert_eq!(rejected, 1);
                let ids: Vec<&str> = events.iter().map(|e| e.event_id.as_str()).collect();
                assert_eq!(ids, vec!["evt-0", "evt-1", "evt-3"]);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_tombstones_and_all_malformed_still_commit() {
        let h = harness(100);
        let mut tombstone = LogMessage::new(TOPIC, 3, 9, Vec::new());
        tombstone.payload = None;
        let batch = MessageBatch::new(vec![
            LogMessage::new(TOPIC, 3, 8, malformed_payload()),
            tombstone,
        ]);

        let report = h.pipeline.process_batch(batch).await.unwrap();

        assert_eq!(report.windows, 0);
        assert!(h.recorder.windows().is_empty());
        assert_eq!(h.consumer.committed(TOPIC, 3), Some(10));
        assert_eq!(h.pipeline.stats().errors, 1);
    }

    #[tokio::test]
    async fn test_commit_per_partition() {
        let h = harness(100);
        let batch = MessageBatch::new(vec![
            LogMessage::new(TOPIC, 0, 5, valid_payload(1)),
            LogMessage::new(TOPIC, 1, 70, valid_payload(2)),
            LogMessage::new(TOPIC, 0, 6, valid_payload(3)),
        ]);

        h.pipeline.process_batch(batch).await.unwrap();

        assert_eq!(h.consumer.committed(TOPIC, 0), Some(7));
        assert_eq!(h.consumer.committed(TOPIC, 1), Some(71));
    }

    #[tokio::test]
    async fn test_redelivery_is_idempotent() {
        let h = harness(100);
        let batch = batch_of(TOPIC, 0, 0, valid_payloads(0, 20));

        h.pipeline.process_batch(batch.clone()).await.unwrap();
        h.pipeline.process_batch(batch).await.unwrap();

        assert_eq!(h.store.document_total(DEFAULT_INDEX), 20);
    }

    #[tokio::test]
    async fn test_run_processes_until_stopped() {
        let h = harness(100);
        h.consumer.push_batch(batch_of(TOPIC, 0, 0, valid_payloads(0, 30)));
        h.consumer.push_batch(batch_of(TOPIC, 0, 30, valid_payloads(30, 30)));

        let pipeline = h.pipeline.clone();
        let handle = tokio::spawn(async move { pipeline.run().await });

        for _ in 0..200 {
            if h.consumer.commits().len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        h.pipeline.stop();

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
        assert_eq!(h.consumer.committed(TOPIC, 0), Some(60));
        assert!(h.consumer.is_disconnected());
    }

    #[tokio::test]
    async fn test_driven_as_trait_object() {
        let h = harness(100);
        h.consumer.push_batch(batch_of(TOPIC, 0, 0, valid_payloads(0, 12)));
        let api: Arc<dyn IngestionApi> = h.pipeline.clone();

        let runner = Arc::clone(&api);
        let handle = tokio::spawn(async move { runner.run().await });
        for _ in 0..200 {
            if !h.consumer.commits().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        api.stop();

        handle.await.unwrap().unwrap();
        assert_eq!(api.stats().processed, 12);
        assert_eq!(api.stats().indexed, 12);
        assert_eq!(h.consumer.committed(TOPIC, 0), Some(12));
    }

    #[tokio::test]
    async fn test_stop_before_run_returns_immediately() {
        let h = harness(100);
        h.consumer.push_batch(batch_of(TOPIC, 0, 0, valid_payloads(0, 5)));
        h.pipeline.stop();

        h.pipeline.run().await.unwrap();

        assert_eq!(h.consumer.pending(), 1);
        assert!(h.consumer.commits().is_empty());
    }

    #[tokio::test]
    async fn test_run_returns_error_after_failed_batch() {
        let h = harness(100);
        let mut failures = h.bus.subscribe(EventFilter::topics(vec![EventTopic::Failures]));
        h.recorder.fail_write(0);
        h.consumer.push_batch(batch_of(TOPIC, 0, 0, valid_payloads(0, 5)));

        let result = h.pipeline.run().await;

        assert!(matches!(result, Err(PipelineError::Store(_))));
        assert!(h.consumer.commits().is_empty());
        assert!(h.consumer.is_disconnected());
        assert!(matches!(
            failures.recv().await.unwrap(),
            IngestEvent::BatchFailed { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_receive_errors_are_retried() {
        let h = harness(100);
        h.consumer.push_error(BrokerError::Receive("broker transport failure".into()));
        h.consumer.push_error(BrokerError::Receive("broker transport failure".into()));
        h.consumer.push_batch(batch_of(TOPIC, 0, 0, valid_payloads(0, 3)));

        let pipeline = h.pipeline.clone();
        let handle = tokio::spawn(async move { pipeline.run().await });

        for _ in 0..100 {
            if !h.consumer.commits().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        h.pipeline.stop();

        assert!(handle.await.unwrap().is_ok());
        assert_eq!(h.consumer.committed(TOPIC, 0), Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_receive_errors_end_run() {
        let h = harness(100);
        for _ in 0..=PipelineConfig::default().max_receive_retries {
            h.consumer.push_error(BrokerError::Receive("all brokers down".into()));
        }

        let result = h.pipeline.run().await;
        assert!(matches!(result, Err(PipelineError::Broker(BrokerError::Receive(_)))));
    }
}
