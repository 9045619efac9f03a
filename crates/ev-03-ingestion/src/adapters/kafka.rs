//! # Kafka Log Consumer
//!
//! `LogConsumer` on an rdkafka `StreamConsumer`.
//!
//! Batches are assembled client-side: the first message is awaited for up to
//! `batch_wait`, then messages keep being collected until `max_batch_messages`
//! or the same wait elapses again. Auto-commit is off; the pipeline commits
//! explicitly once a batch is durable.

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::BorrowedMessage;
use rdkafka::topic_partition_list::TopicPartitionList;
use rdkafka::{Message, Offset};
use shared_bus::PartitionOffset;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, info, trace, warn};

use crate::domain::{BrokerError, LogMessage, MessageBatch};
use crate::ports::LogConsumer;

/// Connection and batching settings for [`KafkaLogConsumer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KafkaConfig {
    /// Comma-separated bootstrap servers.
    pub brokers: String,
    pub topic: String,
    pub group_id: String,
    pub client_id: String,
    /// Upper bound on messages per delivered batch.
    pub max_batch_messages: usize,
    /// How long to wait for a batch to fill.
    pub batch_wait: Duration,
    pub session_timeout: Duration,
    pub heartbeat_interval: Duration,
    /// Longest a batch may take between two receives before the group
    /// drops this member. Must outlast the slowest batch the store allows.
    pub max_poll_interval: Duration,
}

/// Default for [`KafkaConfig::max_poll_interval`].
pub const DEFAULT_MAX_POLL_INTERVAL: Duration = Duration::from_secs(900);

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".to_string(),
            topic: "analytics-events".to_string(),
            group_id: "analytics-consumer-group".to_string(),
            client_id: "analytics-ingestion".to_string(),
            max_batch_messages: 500,
            batch_wait: Duration::from_millis(250),
            session_timeout: Duration::from_secs(30),
            heartbeat_interval: Duration::from_secs(3),
            max_poll_interval: DEFAULT_MAX_POLL_INTERVAL,
        }
    }
}

impl KafkaConfig {
    fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", &self.brokers)
            .set("group.id", &self.group_id)
            .set("client.id", &self.client_id)
            .set("enable.auto.commit", "false")
            .set("enable.auto.offset.store", "false")
            .set("auto.offset.reset", "latest")
            .set("session.timeout.ms", self.session_timeout.as_millis().to_string())
            .set(
                "heartbeat.interval.ms",
                self.heartbeat_interval.as_millis().to_string(),
            )
            .set(
                "max.poll.interval.ms",
                self.max_poll_interval.as_millis().to_string(),
            )
            .set("retry.backoff.ms", "100")
            .set("fetch.wait.max.ms", "100");
        config
    }
}

pub struct KafkaLogConsumer {
    consumer: Arc<StreamConsumer>,
    config: KafkaConfig,
}

impl KafkaLogConsumer {
    pub fn new(config: KafkaConfig) -> Result<Self, BrokerError> {
        let consumer: StreamConsumer = config
            .client_config()
            .create()
            .map_err(|e| BrokerError::Setup(e.to_string()))?;
        Ok(Self {
            consumer: Arc::new(consumer),
            config,
        })
    }

    pub fn config(&self) -> &KafkaConfig {
        &self.config
    }
}

fn to_log_message(message: &BorrowedMessage<'_>) -> LogMessage {
    LogMessage {
        topic: message.topic().to_string(),
        partition: message.partition(),
        offset: message.offset(),
        key: message.key().map(<[u8]>::to_vec),
        payload: message.payload().map(<[u8]>::to_vec),
        timestamp: message.timestamp().to_millis(),
    }
}

#[async_trait]
impl LogConsumer for KafkaLogConsumer {
    async fn subscribe(&self) -> Result<(), BrokerError> {
        self.consumer
            .subscribe(&[&self.config.topic])
            .map_err(|e| BrokerError::Subscribe(e.to_string()))?;
        info!(
            topic = %self.config.topic,
            group_id = %self.config.group_id,
            brokers = %self.config.brokers,
            "Subscribed to log"
        );
        Ok(())
    }

    async fn next_batch(&self) -> Result<Option<MessageBatch>, BrokerError> {
        let first = match timeout(self.config.batch_wait, self.consumer.recv()).await {
            Err(_) => return Ok(None),
            Ok(received) => received.map_err(|e| BrokerError::Receive(e.to_string()))?,
        };

        let mut messages = Vec::with_capacity(self.config.max_batch_messages);
        messages.push(to_log_message(&first));
        drop(first);

        let deadline = Instant::now() + self.config.batch_wait;
        while messages.len() < self.config.max_batch_messages {
            match timeout_at(deadline, self.consumer.recv()).await {
                Ok(Ok(message)) => messages.push(to_log_message(&message)),
                Ok(Err(e)) => {
                    // deliver what we have; the error resurfaces on the next receive
                    warn!(error = %e, collected = messages.len(), "Receive failed mid-batch");
                    break;
                }
                Err(_) => break,
            }
        }

        trace!(messages = messages.len(), "Batch assembled");
        Ok(Some(MessageBatch::new(messages)))
    }

    async fn heartbeat(&self) -> Result<(), BrokerError> {
        // librdkafka heartbeats from its own thread; a slow batch is bounded
        // by max.poll.interval.ms instead
        trace!("Heartbeat");
        Ok(())
    }

    async fn commit(&self, offsets: &[PartitionOffset]) -> Result<(), BrokerError> {
        let mut tpl = TopicPartitionList::new();
        for position in offsets {
            tpl.add_partition_offset(
                &position.topic,
                position.partition,
                Offset::Offset(position.offset),
            )
            .map_err(|e| BrokerError::Commit(e.to_string()))?;
        }

        let consumer = self.consumer.clone();
        tokio::task::spawn_blocking(move || consumer.commit(&tpl, CommitMode::Sync))
            .await
            .map_err(|e| BrokerError::Commit(e.to_string()))?
            .map_err(|e| BrokerError::Commit(e.to_string()))?;

        debug!(partitions = offsets.len(), "Offsets committed to broker");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), BrokerError> {
        self.consumer.unsubscribe();
        info!(group_id = %self.config.group_id, "Left consumer group");
        Ok(())
    }
}
