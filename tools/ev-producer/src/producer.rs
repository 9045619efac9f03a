//! Publishing generated events to the log.

use std::time::Duration;

use futures::future::join_all;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use shared_types::RawEvent;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProducerError {
    #[error("Failed to create producer: {0}")]
    Setup(String),

    #[error("Failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("{failed} of {total} message(s) not delivered: {first}")]
    Delivery {
        failed: usize,
        total: usize,
        first: String,
    },
}

pub struct EventProducer {
    producer: FutureProducer,
    topic: String,
    delivery_timeout: Duration,
}

impl EventProducer {
    pub fn new(brokers: &str, topic: &str, client_id: &str) -> Result<Self, ProducerError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("client.id", client_id)
            .set("message.timeout.ms", "30000")
            .set("linger.ms", "5")
            .create()
            .map_err(|e| ProducerError::Setup(e.to_string()))?;

        Ok(Self {
            producer,
            topic: topic.to_string(),
            delivery_timeout: Duration::from_secs(5),
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Send `events` keyed by user id and wait for every delivery report.
    pub async fn send_batch(&self, events: &[RawEvent]) -> Result<usize, ProducerError> {
        let encoded = events
            .iter()
            .map(|event| -> Result<(String, String), ProducerError> {
                Ok((event.user_id.to_string(), serde_json::to_string(event)?))
            })
            .collect::<Result<Vec<(String, String)>, ProducerError>>()?;

        let deliveries = encoded.iter().map(|(key, payload)| {
            let record = FutureRecord::to(&self.topic).key(key).payload(payload);
            self.producer.send(record, self.delivery_timeout)
        });

        let results = join_all(deliveries).await;
        let total = results.len();
        let failures: Vec<String> = results
            .into_iter()
            .filter_map(|result| result.err().map(|(e, _)| e.to_string()))
            .collect();

        match failures.first() {
            None => Ok(total),
            Some(first) => Err(ProducerError::Delivery {
                failed: failures.len(),
                total,
                first: first.clone(),
            }),
        }
    }
}
