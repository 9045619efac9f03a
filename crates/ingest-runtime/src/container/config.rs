//! # Service Configuration
//!
//! Unified configuration for the pipelines, the store, the hub and the HTTP
//! listener. Every value has a default and can be overridden from the
//! environment.
//!
//! ## Validation
//!
//! - Thresholds, capacities and intervals must be non-zero
//! - `EV_REPLAY_COUNT` must not exceed `EV_HISTORY_CAPACITY`
//! - Brokers, topic and group id must be non-empty
//! - `EV_MAX_POLL_INTERVAL_MS` must outlast the slowest batch the store
//!   retry policy allows, or the group evicts the consumer mid-batch

use std::env;
use std::str::FromStr;
use std::time::Duration;

use ev_01_store_writer::{ElasticsearchConfig, RetryPolicy, WriterConfig, DEFAULT_INDEX};
use ev_02_broadcast_hub::HubConfig;
use ev_03_ingestion::{KafkaConfig, PipelineConfig};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// An environment variable could not be parsed.
    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    /// A value parsed but is unusable.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete service configuration.
#[derive(Debug, Clone, Default)]
pub struct IngestConfig {
    pub broker: BrokerSettings,
    pub pipeline: PipelineConfig,
    pub store: StoreSettings,
    pub hub: HubConfig,
    pub server: ServerSettings,
    pub reporting: ReportingSettings,
}

/// Log broker connection and consumer-group settings.
#[derive(Debug, Clone)]
pub struct BrokerSettings {
    /// Comma-separated bootstrap servers.
    pub brokers: String,
    pub topic: String,
    pub group_id: String,
    pub client_id: String,
    pub max_batch_messages: usize,
    pub batch_wait: Duration,
    pub session_timeout: Duration,
    pub heartbeat_interval: Duration,
    pub max_poll_interval: Duration,
    /// Pipelines started in this process, all in the same group.
    pub consumer_instances: usize,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        let kafka = KafkaConfig::default();
        Self {
            brokers: kafka.brokers,
            topic: kafka.topic,
            group_id: kafka.group_id,
            client_id: kafka.client_id,
            max_batch_messages: kafka.max_batch_messages,
            batch_wait: kafka.batch_wait,
            session_timeout: kafka.session_timeout,
            heartbeat_interval: kafka.heartbeat_interval,
            max_poll_interval: kafka.max_poll_interval,
            consumer_instances: 1,
        }
    }
}

/// Search store settings.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub url: String,
    pub index: String,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:9200".to_string(),
            index: DEFAULT_INDEX.to_string(),
            timeout: Duration::from_secs(30),
            max_retries: RetryPolicy::default().max_retries,
        }
    }
}

/// HTTP / WebSocket listener.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

/// Periodic stats report.
#[derive(Debug, Clone)]
pub struct ReportingSettings {
    pub interval: Duration,
}

impl Default for ReportingSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
        }
    }
}

fn parsed<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value }),
    }
}

fn millis(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    let default_ms = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
    parsed(lookup, var, default_ms).map(Duration::from_millis)
}

impl IngestConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`IngestConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();

        let broker = BrokerSettings {
            brokers: lookup("KAFKA_BROKERS").unwrap_or(d.broker.brokers),
            topic: lookup("KAFKA_TOPIC").unwrap_or(d.broker.topic),
            group_id: lookup("KAFKA_GROUP_ID").unwrap_or(d.broker.group_id),
            client_id: lookup("KAFKA_CLIENT_ID").unwrap_or(d.broker.client_id),
            max_batch_messages: parsed(
                &lookup,
                "EV_MAX_BATCH_MESSAGES",
                d.broker.max_batch_messages,
            )?,
            batch_wait: millis(&lookup, "EV_BATCH_WAIT_MS", d.broker.batch_wait)?,
            session_timeout: millis(&lookup, "EV_SESSION_TIMEOUT_MS", d.broker.session_timeout)?,
            heartbeat_interval: millis(
                &lookup,
                "EV_HEARTBEAT_INTERVAL_MS",
                d.broker.heartbeat_interval,
            )?,
            max_poll_interval: millis(
                &lookup,
                "EV_MAX_POLL_INTERVAL_MS",
                d.broker.max_poll_interval,
            )?,
            consumer_instances: parsed(
                &lookup,
                "EV_CONSUMER_INSTANCES",
                d.broker.consumer_instances,
            )?,
        };

        let pipeline = PipelineConfig {
            flush_threshold: parsed(&lookup, "BATCH_SIZE", d.pipeline.flush_threshold)?,
            ..d.pipeline
        };

        let store = StoreSettings {
            url: lookup("ES_NODE").unwrap_or(d.store.url),
            index: lookup("ES_INDEX").unwrap_or(d.store.index),
            timeout: millis(&lookup, "EV_STORE_TIMEOUT_MS", d.store.timeout)?,
            max_retries: parsed(&lookup, "EV_STORE_MAX_RETRIES", d.store.max_retries)?,
        };

        let hub = HubConfig {
            history_capacity: parsed(&lookup, "EV_HISTORY_CAPACITY", d.hub.history_capacity)?,
            replay_count: parsed(&lookup, "EV_REPLAY_COUNT", d.hub.replay_count)?,
            outbox_capacity: parsed(&lookup, "EV_OUTBOX_CAPACITY", d.hub.outbox_capacity)?,
            max_consecutive_drops: parsed(
                &lookup,
                "EV_MAX_CONSECUTIVE_DROPS",
                d.hub.max_consecutive_drops,
            )?,
            send_timeout: millis(&lookup, "EV_SEND_TIMEOUT_MS", d.hub.send_timeout)?,
        };

        let server = ServerSettings {
            port: parsed(&lookup, "WS_PORT", d.server.port)?,
        };

        let reporting = ReportingSettings {
            interval: Duration::from_secs(parsed(
                &lookup,
                "EV_STATS_INTERVAL_SECS",
                d.reporting.interval.as_secs(),
            )?),
        };

        Ok(Self {
            broker,
            pipeline,
            store,
            hub,
            server,
            reporting,
        })
    }

    /// Reject configurations the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("KAFKA_BROKERS", self.broker.brokers.trim()),
            ("KAFKA_TOPIC", self.broker.topic.trim()),
            ("KAFKA_GROUP_ID", self.broker.group_id.trim()),
            ("ES_INDEX", self.store.index.trim()),
        ];
        for (var, value) in required {
            if value.is_empty() {
                return Err(ConfigError::Invalid(format!("{} must not be empty", var)));
            }
        }

        let non_zero = [
            ("BATCH_SIZE", self.pipeline.flush_threshold as u128),
            ("EV_MAX_BATCH_MESSAGES", self.broker.max_batch_messages as u128),
            ("EV_BATCH_WAIT_MS", self.broker.batch_wait.as_millis()),
            ("EV_CONSUMER_INSTANCES", self.broker.consumer_instances as u128),
            ("EV_HISTORY_CAPACITY", self.hub.history_capacity as u128),
            ("EV_OUTBOX_CAPACITY", self.hub.outbox_capacity as u128),
            ("EV_MAX_CONSECUTIVE_DROPS", u128::from(self.hub.max_consecutive_drops)),
            ("EV_SEND_TIMEOUT_MS", self.hub.send_timeout.as_millis()),
            ("EV_STATS_INTERVAL_SECS", u128::from(self.reporting.interval.as_secs())),
        ];
        for (var, value) in non_zero {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{} must be greater than zero", var)));
            }
        }

        if self.hub.replay_count > self.hub.history_capacity {
            return Err(ConfigError::Invalid(format!(
                "EV_REPLAY_COUNT ({}) exceeds EV_HISTORY_CAPACITY ({})",
                self.hub.replay_count, self.hub.history_capacity
            )));
        }

        if self.broker.heartbeat_interval >= self.broker.session_timeout {
            return Err(ConfigError::Invalid(
                "EV_HEARTBEAT_INTERVAL_MS must be lower than EV_SESSION_TIMEOUT_MS".to_string(),
            ));
        }

        let slowest = self.slowest_batch();
        if self.broker.max_poll_interval <= slowest {
            return Err(ConfigError::Invalid(format!(
                "EV_MAX_POLL_INTERVAL_MS ({}) must exceed the slowest batch the store allows ({} ms)",
                self.broker.max_poll_interval.as_millis(),
                slowest.as_millis()
            )));
        }

        Ok(())
    }

    /// Upper bound on store time for one delivered batch: every window of a
    /// full batch timing out on every attempt.
    pub fn slowest_batch(&self) -> Duration {
        let windows = self
            .broker
            .max_batch_messages
            .div_ceil(self.pipeline.flush_threshold.max(1));
        let attempts = self.store.max_retries.saturating_add(1);
        self.store
            .timeout
            .saturating_mul(attempts)
            .saturating_mul(u32::try_from(windows).unwrap_or(u32::MAX))
    }

    /// Consumer settings for pipeline `instance`.
    pub fn kafka_config(&self, instance: usize) -> KafkaConfig {
        let client_id = if self.broker.consumer_instances > 1 {
            format!("{}-{}", self.broker.client_id, instance)
        } else {
            self.broker.client_id.clone()
        };
        KafkaConfig {
            brokers: self.broker.brokers.clone(),
            topic: self.broker.topic.clone(),
            group_id: self.broker.group_id.clone(),
            client_id,
            max_batch_messages: self.broker.max_batch_messages,
            batch_wait: self.broker.batch_wait,
            session_timeout: self.broker.session_timeout,
            heartbeat_interval: self.broker.heartbeat_interval,
            max_poll_interval: self.broker.max_poll_interval,
        }
    }

    pub fn elasticsearch_config(&self) -> ElasticsearchConfig {
        ElasticsearchConfig {
            url: self.store.url.clone(),
            timeout: self.store.timeout,
        }
    }

    pub fn writer_config(&self) -> WriterConfig {
        WriterConfig {
            index: self.store.index.clone(),
            retry: RetryPolicy {
                max_retries: self.store.max_retries,
                ..RetryPolicy::default()
            },
        }
    }
}
