//! Prometheus metrics for the ingestion service.
//!
//! All metrics follow the naming convention: `ev_<component>_<metric>_<unit>`
//!
//! Pipeline and hub counters live as atomics inside their crates; the runtime
//! mirrors them into the gauges below on every stats report.

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge,
    IntGaugeVec, Opts, Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // INGESTION
    // =========================================================================

    /// Stats aggregator snapshot, one series per counter
    /// (processed / indexed / rejected / errors)
    pub static ref INGEST_EVENTS: IntGaugeVec = IntGaugeVec::new(
        Opts::new("ev_ingest_events", "Ingestion counters as of the last stats report"),
        &["counter"]
    ).expect("metric creation failed");

    /// Flush bus events seen by the live relay, by topic
    pub static ref FLUSH_EVENTS: IntCounterVec = IntCounterVec::new(
        Opts::new("ev_bus_flush_events_total", "Flush events received by the live relay"),
        &["topic"]
    ).expect("metric creation failed");

    /// Documents per indexed window
    pub static ref WINDOW_DOCUMENTS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "ev_ingest_window_documents",
            "Confirmed documents per indexed window"
        ).buckets(exponential_buckets(1.0, 2.0, 12).expect("bucket layout"))
    ).expect("metric creation failed");

    /// Flush events the live relay skipped because it fell behind
    pub static ref RELAY_LAGGED: IntCounter = IntCounter::new(
        "ev_bus_relay_lagged_total",
        "Flush events skipped by the live relay"
    ).expect("metric creation failed");

    // =========================================================================
    // STORE
    // =========================================================================

    /// Document count reported by the store
    pub static ref STORE_DOCUMENTS: IntGauge = IntGauge::new(
        "ev_store_documents",
        "Documents in the index as of the last stats report"
    ).expect("metric creation failed");

    /// Search latency for the recent-events endpoint
    pub static ref STORE_SEARCH_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "ev_store_search_duration_seconds",
            "Time spent serving recent-event searches"
        ).buckets(exponential_buckets(0.001, 2.0, 14).expect("bucket layout"))
    ).expect("metric creation failed");

    // =========================================================================
    // BROADCAST HUB
    // =========================================================================

    /// Live subscriber connections
    pub static ref HUB_CONNECTIONS: IntGauge = IntGauge::new(
        "ev_hub_connections",
        "Currently registered live connections"
    ).expect("metric creation failed");

    /// Messages not delivered because a connection outbox was full
    pub static ref HUB_MESSAGES_DROPPED: IntGauge = IntGauge::new(
        "ev_hub_messages_dropped",
        "Messages dropped for slow connections since start"
    ).expect("metric creation failed");

    /// Connections removed for being too slow
    pub static ref HUB_CONNECTIONS_EVICTED: IntGauge = IntGauge::new(
        "ev_hub_connections_evicted",
        "Connections evicted for sustained backpressure since start"
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// Safe to call more than once.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Ingestion
        Box::new(INGEST_EVENTS.clone()),
        Box::new(FLUSH_EVENTS.clone()),
        Box::new(WINDOW_DOCUMENTS.clone()),
        Box::new(RELAY_LAGGED.clone()),
        // Store
        Box::new(STORE_DOCUMENTS.clone()),
        Box::new(STORE_SEARCH_DURATION.clone()),
        // Hub
        Box::new(HUB_CONNECTIONS.clone()),
        Box::new(HUB_MESSAGES_DROPPED.clone()),
        Box::new(HUB_CONNECTIONS_EVICTED.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::HistogramTimer::new(&$histogram)
    };
}
