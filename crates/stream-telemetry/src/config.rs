//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for logging, trace export and metrics.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name for traces and logs
    pub service_name: String,

    /// Log level filter used when `RUST_LOG` is unset
    pub log_level: String,

    /// Whether to write log lines to stdout
    pub console_output: bool,

    /// JSON log lines instead of the human-readable format
    pub json_logs: bool,

    /// Export spans over OTLP
    pub otlp_enabled: bool,

    /// OTLP collector endpoint
    pub otlp_endpoint: String,

    /// Deployment name attached to exported spans (dev, staging, prod)
    pub environment: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "analytics-ingestion".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
            otlp_enabled: false,
            otlp_endpoint: "http://localhost:4317".to_string(),
            environment: "dev".to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OTEL_SERVICE_NAME`: Service name (default: analytics-ingestion)
    /// - `EV_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `EV_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `EV_JSON_LOGS`: Enable JSON logs (default: false in dev, true in containers)
    /// - `EV_OTLP_ENABLED`: Export spans over OTLP (default: false)
    /// - `OTEL_EXPORTER_OTLP_ENDPOINT`: Collector endpoint (default: http://localhost:4317)
    /// - `EV_ENVIRONMENT`: Deployment name (default: dev)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`TelemetryConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let is_container =
            lookup("KUBERNETES_SERVICE_HOST").is_some() || lookup("DOCKER_CONTAINER").is_some();

        Self {
            service_name: lookup("OTEL_SERVICE_NAME").unwrap_or(defaults.service_name),

            log_level: lookup("EV_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or(defaults.log_level),

            console_output: lookup("EV_CONSOLE_OUTPUT")
                .map(|v| !is_falsy(&v))
                .unwrap_or(defaults.console_output),

            json_logs: lookup("EV_JSON_LOGS")
                .map(|v| is_truthy(&v))
                .unwrap_or(is_container),

            otlp_enabled: lookup("EV_OTLP_ENABLED")
                .map(|v| is_truthy(&v))
                .unwrap_or(defaults.otlp_enabled),

            otlp_endpoint: lookup("OTEL_EXPORTER_OTLP_ENDPOINT").unwrap_or(defaults.otlp_endpoint),

            environment: lookup("EV_ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }
}

fn is_truthy(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

fn is_falsy(value: &str) -> bool {
    value.eq_ignore_ascii_case("false") || value == "0"
}
