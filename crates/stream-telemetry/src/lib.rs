//! # Stream Telemetry
//!
//! Logging, trace export and metrics for the ingestion service.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stream_telemetry::{init_telemetry, TelemetryConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let _guard = init_telemetry(TelemetryConfig::from_env()).expect("telemetry");
//!     // spans, logs and metrics are now collected
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `EV_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `EV_JSON_LOGS` | `false` (`true` in containers) | JSON log lines |
//! | `EV_OTLP_ENABLED` | `false` | Export spans over OTLP |
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | `http://localhost:4317` | OTLP collector |
//! | `OTEL_SERVICE_NAME` | `analytics-ingestion` | Service name |

mod config;
mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::{
    encode_metrics, register_metrics, HistogramTimer, FLUSH_EVENTS, HUB_CONNECTIONS,
    HUB_CONNECTIONS_EVICTED, HUB_MESSAGES_DROPPED, INGEST_EVENTS, REGISTRY, RELAY_LAGGED,
    STORE_DOCUMENTS, STORE_SEARCH_DURATION, WINDOW_DOCUMENTS,
};
pub use tracing_setup::TracingGuard;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize tracing: {0}")]
    TracerInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize metrics and the global tracing subscriber.
///
/// Hold the returned guard for the lifetime of the process; dropping it
/// flushes pending spans.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    register_metrics()?;
    let tracing = tracing_setup::init_tracing(&config)?;

    Ok(TelemetryGuard { _tracing: tracing })
}

/// Guard that keeps telemetry active. Drop to flush and shutdown.
pub struct TelemetryGuard {
    _tracing: TracingGuard,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry...");
    }
}
