//! # Stats Reporter
//!
//! Every reporting interval: one structured log line with ingestion
//! counters, store document count and live connection count. The same values
//! are mirrored into the Prometheus gauges.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ev_01_store_writer::{BulkStore, StoreWriter};
use ev_02_broadcast_hub::{BroadcastHub, HubSnapshot};
use ev_03_ingestion::{IngestStats, StatsSnapshot};
use serde::Serialize;
use stream_telemetry::{
    HUB_CONNECTIONS, HUB_CONNECTIONS_EVICTED, HUB_MESSAGES_DROPPED, INGEST_EVENTS, STORE_DOCUMENTS,
};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreReport {
    /// `None` when the count query failed.
    pub document_count: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveReport {
    pub connected_clients: usize,
    pub messages_dropped: u64,
    pub connections_evicted: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub timestamp: DateTime<Utc>,
    pub ingestion: StatsSnapshot,
    pub store: StoreReport,
    pub live: LiveReport,
}

impl StatsReport {
    fn new(ingestion: StatsSnapshot, document_count: Option<u64>, hub: HubSnapshot) -> Self {
        Self {
            timestamp: Utc::now(),
            ingestion,
            store: StoreReport { document_count },
            live: LiveReport {
                connected_clients: hub.connections,
                messages_dropped: hub.dropped,
                connections_evicted: hub.evicted,
            },
        }
    }
}

/// Gather one report. A failing count query does not fail the report.
pub async fn collect_report<S: BulkStore>(
    writer: &StoreWriter<S>,
    stats: &IngestStats,
    hub: &BroadcastHub,
) -> StatsReport {
    let document_count = match writer.document_count().await {
        Ok(count) => Some(count),
        Err(e) => {
            warn!(error = %e, "Document count unavailable for stats report");
            None
        }
    };
    StatsReport::new(stats.snapshot(), document_count, hub.snapshot())
}

fn to_gauge(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Mirror a report into the gauges and log it.
pub fn publish_report(report: &StatsReport) {
    let ingestion = &report.ingestion;
    INGEST_EVENTS
        .with_label_values(&["processed"])
        .set(to_gauge(ingestion.processed));
    INGEST_EVENTS
        .with_label_values(&["indexed"])
        .set(to_gauge(ingestion.indexed));
    INGEST_EVENTS
        .with_label_values(&["rejected"])
        .set(to_gauge(ingestion.rejected));
    INGEST_EVENTS
        .with_label_values(&["errors"])
        .set(to_gauge(ingestion.errors));
    if let Some(count) = report.store.document_count {
        STORE_DOCUMENTS.set(to_gauge(count));
    }
    HUB_CONNECTIONS.set(to_gauge(report.live.connected_clients as u64));
    HUB_MESSAGES_DROPPED.set(to_gauge(report.live.messages_dropped));
    HUB_CONNECTIONS_EVICTED.set(to_gauge(report.live.connections_evicted));

    let stats = serde_json::to_string(report).unwrap_or_default();
    info!(
        processed = ingestion.processed,
        indexed = ingestion.indexed,
        rejected = ingestion.rejected,
        errors = ingestion.errors,
        document_count = ?report.store.document_count,
        connected_clients = report.live.connected_clients,
        %stats,
        "Stats report"
    );
}

/// Report every `interval` until shutdown. The first report comes after
/// one full interval.
pub async fn run_reporter<S: BulkStore>(
    writer: Arc<StoreWriter<S>>,
    stats: Arc<IngestStats>,
    hub: Arc<BroadcastHub>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => break,
            _ = ticker.tick() => {
                let report = collect_report(&writer, &stats, &hub).await;
                publish_report(&report);
            }
        }
    }
}
