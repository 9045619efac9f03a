//! Test utilities for the ingestion pipeline.
//!
//! Enable with the `test-utils` feature flag.
//!
//! - [`ScriptedConsumer`]: a log consumer that replays queued batches and
//!   records heartbeats and commits
//! - [`RecordingWriter`]: a `DocumentWriter` decorator that records window
//!   sizes and can fail chosen writes
//! - payload builders for valid and malformed events

use async_trait::async_trait;
use ev_01_store_writer::{DocumentWriter, StoreError, WriteOutcome, WriterError};
use parking_lot::Mutex;
use shared_bus::PartitionOffset;
use shared_types::ProcessedEvent;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::{BrokerError, LogMessage, MessageBatch};
use crate::ports::LogConsumer;

/// How long an idle [`ScriptedConsumer`] waits before reporting no batch.
pub const IDLE_WAIT: Duration = Duration::from_millis(10);

#[derive(Default)]
struct Script {
    batches: VecDeque<Result<MessageBatch, BrokerError>>,
    commits: Vec<Vec<PartitionOffset>>,
    heartbeats: usize,
    subscribed: bool,
    disconnected: bool,
    fail_commit: Option<BrokerError>,
}

/// Log consumer driven by a script.
///
/// Clones share the script, so a test can keep a handle while the pipeline
/// owns another.
#[derive(Clone, Default)]
pub struct ScriptedConsumer {
    script: Arc<Mutex<Script>>,
}

impl ScriptedConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_batch(&self, batch: MessageBatch) {
        self.script.lock().batches.push_back(Ok(batch));
    }

    /// Make the next receive fail.
    pub fn push_error(&self, err: BrokerError) {
        self.script.lock().batches.push_back(Err(err));
    }

    pub fn fail_commits(&self, err: BrokerError) {
        self.script.lock().fail_commit = Some(err);
    }

    /// Batches not yet delivered.
    pub fn pending(&self) -> usize {
        self.script.lock().batches.len()
    }

    /// Every commit call, in order.
    pub fn commits(&self) -> Vec<Vec<PartitionOffset>> {
        self.script.lock().commits.clone()
    }

    /// Latest committed position for `topic`/`partition`.
    pub fn committed(&self, topic: &str, partition: i32) -> Option<i64> {
        self.script
            .lock()
            .commits
            .iter()
            .flatten()
            .filter(|p| p.topic == topic && p.partition == partition)
            .map(|p| p.offset)
            .max()
    }

    pub fn heartbeats(&self) -> usize {
        self.script.lock().heartbeats
    }

    pub fn is_subscribed(&self) -> bool {
        self.script.lock().subscribed
    }

    pub fn is_disconnected(&self) -> bool {
        self.script.lock().disconnected
    }
}

#[async_trait]
impl LogConsumer for ScriptedConsumer {
    async fn subscribe(&self) -> Result<(), BrokerError> {
        self.script.lock().subscribed = true;
        Ok(())
    }

    async fn next_batch(&self) -> Result<Option<MessageBatch>, BrokerError> {
        let next = self.script.lock().batches.pop_front();
        match next {
            Some(result) => result.map(Some),
            None => {
                tokio::time::sleep(IDLE_WAIT).await;
                Ok(None)
            }
        }
    }

    async fn heartbeat(&self) -> Result<(), BrokerError> {
        self.script.lock().heartbeats += 1;
        Ok(())
    }

    async fn commit(&self, offsets: &[PartitionOffset]) -> Result<(), BrokerError> {
        let mut script = self.script.lock();
        if let Some(err) = script.fail_commit.clone() {
            return Err(err);
        }
        script.commits.push(offsets.to_vec());
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), BrokerError> {
        let mut script = self.script.lock();
        script.subscribed = false;
        script.disconnected = true;
        Ok(())
    }
}

#[derive(Default)]
struct Recording {
    windows: Vec<usize>,
    fail: HashSet<usize>,
}

/// Records the size of every window written and fails selected writes.
pub struct RecordingWriter {
    inner: Arc<dyn DocumentWriter>,
    recording: Mutex<Recording>,
}

impl RecordingWriter {
    pub fn new(inner: Arc<dyn DocumentWriter>) -> Self {
        Self {
            inner,
            recording: Mutex::new(Recording::default()),
        }
    }

    /// Fail the `n`-th write (0-based) without touching the store.
    pub fn fail_write(&self, n: usize) {
        self.recording.lock().fail.insert(n);
    }

    /// Sizes of the windows written so far, failed ones included.
    pub fn windows(&self) -> Vec<usize> {
        self.recording.lock().windows.clone()
    }
}

#[async_trait]
impl DocumentWriter for RecordingWriter {
    async fn write(&self, batch: &[ProcessedEvent]) -> Result<WriteOutcome, WriterError> {
        let fail = {
            let mut recording = self.recording.lock();
            let n = recording.windows.len();
            recording.windows.push(batch.len());
            recording.fail.contains(&n)
        };
        if fail {
            return Err(WriterError::WriteFailed {
                documents: batch.len(),
                attempts: 1,
                source: StoreError::Connection("injected failure".to_string()),
            });
        }
        self.inner.write(batch).await
    }
}

/// A valid event payload with `eventId` `evt-{n}` and numeric `userId` `n`.
pub fn valid_payload(n: usize) -> Vec<u8> {
    serde_json::json!({
        "eventId": format!("evt-{}", n),
        "userId": n,
        "sessionId": format!("sess-{}", n % 7),
        "eventType": "page_view",
        "timestamp": "2024-05-01T10:00:00.000Z",
        "properties": { "url": "https://example.com/products", "duration": 1200 },
        "metadata": { "source": "web", "version": "1.0.0" }
    })
    .to_string()
    .into_bytes()
}

/// A payload that is not JSON.
pub fn malformed_payload() -> Vec<u8> {
    b"{\"userId\": 1, \"sessionId\": ".to_vec()
}

/// One message per payload, at consecutive offsets from `first_offset`.
pub fn batch_of(topic: &str, partition: i32, first_offset: i64, payloads: Vec<Vec<u8>>) -> MessageBatch {
    MessageBatch::new(
        payloads
            .into_iter()
            .zip(first_offset..)
            .map(|(payload, offset)| LogMessage::new(topic, partition, offset, payload))
            .collect(),
    )
}

/// `count` valid payloads numbered from `first`.
pub fn valid_payloads(first: usize, count: usize) -> Vec<Vec<u8>> {
    (first..first + count).map(valid_payload).collect()
}
