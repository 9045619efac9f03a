//! # Live Relay
//!
//! Forwards indexed windows from the flush bus to the broadcast hub.
//!
//! The relay is the only subscriber between the pipelines and the hub; if it
//! falls behind, the bus skips events for it and the pipelines never notice.

use std::sync::Arc;

use ev_02_broadcast_hub::BroadcastHub;
use shared_bus::{EventTopic, IngestEvent, Subscription};
use stream_telemetry::{FLUSH_EVENTS, RELAY_LAGGED, WINDOW_DOCUMENTS};
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

fn topic_label(topic: EventTopic) -> &'static str {
    match topic {
        EventTopic::Indexed => "indexed",
        EventTopic::Commits => "commits",
        EventTopic::Failures => "failures",
        EventTopic::All => "all",
    }
}

/// Apply one flush event to the hub. Returns frames queued.
pub fn relay_event(hub: &BroadcastHub, event: IngestEvent) -> usize {
    FLUSH_EVENTS.with_label_values(&[topic_label(event.topic())]).inc();

    match event {
        IngestEvent::WindowIndexed { events, rejected } => {
            WINDOW_DOCUMENTS.observe(events.len() as f64);
            trace!(documents = events.len(), rejected, "Relaying indexed window");
            hub.broadcast_all(events.iter().cloned().map(Arc::new))
        }
        IngestEvent::BatchCommitted { offsets } => {
            trace!(partitions = offsets.len(), "Batch committed");
            0
        }
        IngestEvent::BatchFailed { reason } => {
            warn!(%reason, "Pipeline reported a failed batch");
            0
        }
    }
}

/// Relay until shutdown or until the bus goes away.
pub async fn run_relay(
    mut subscription: Subscription,
    hub: Arc<BroadcastHub>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    info!("Live relay started");
    let mut lagged_seen = 0u64;

    loop {
        let event = tokio::select! {
            _ = shutdown_rx.changed() => break,
            event = subscription.recv() => event,
        };
        let Some(event) = event else {
            debug!("Flush bus closed");
            break;
        };

        let lagged = subscription.lagged();
        if lagged > lagged_seen {
            RELAY_LAGGED.inc_by(lagged - lagged_seen);
            warn!(skipped = lagged - lagged_seen, "Live relay fell behind the flush bus");
            lagged_seen = lagged;
        }

        relay_event(&hub, event);
    }

    info!("Live relay stopped");
}
