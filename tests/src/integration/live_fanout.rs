//! # Live Fan-Out
//!
//! Flushed windows reach every live connection through the relay; history
//! stays bounded; a stalled connection never holds up the pipeline.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::fixtures::{drain, eventually, processed, PipelineHarness, TOPIC};
    use ev_02_broadcast_hub::{BroadcastHub, HubConfig};
    use ev_03_ingestion::test_utils::{batch_of, valid_payloads};
    use ingest_runtime::wiring::run_relay;
    use shared_bus::EventFilter;
    use tokio::sync::watch;

    fn ids(range: std::ops::Range<usize>) -> Vec<String> {
        range.map(|n| format!("evt-{}", n)).collect()
    }

    // =========================================================================
    // HISTORY AND REPLAY
    // =========================================================================

    #[test]
    fn test_history_keeps_newest_1000_of_1500() {
        let hub = BroadcastHub::new(HubConfig::default());
        hub.broadcast_all((0..1500).map(processed));

        let recent = hub.recent(1000);
        assert_eq!(recent.len(), 1000);
        assert_eq!(recent[0].event_id, "evt-500");
        assert_eq!(recent[999].event_id, "evt-1499");
        assert_eq!(hub.snapshot().history_len, 1000);
    }

    #[test]
    fn test_replay_shorter_history_sends_all() {
        let hub = BroadcastHub::new(HubConfig::default());
        hub.broadcast_all((0..30).map(processed));

        let mut reg = hub.register();
        assert_eq!(drain(&mut reg.outbox), ids(0..30));

        hub.broadcast(processed(30));
        assert_eq!(drain(&mut reg.outbox), ids(30..31));
    }

    #[test]
    fn test_replay_longer_history_sends_last_50_then_live() {
        let hub = BroadcastHub::new(HubConfig::default());
        hub.broadcast_all((0..120).map(processed));

        let mut reg = hub.register();
        assert_eq!(drain(&mut reg.outbox), ids(70..120));

        hub.broadcast_all((120..125).map(processed));
        assert_eq!(drain(&mut reg.outbox), ids(120..125));
    }

    // =========================================================================
    // PIPELINE → RELAY → HUB
    // =========================================================================

    #[tokio::test]
    async fn test_stalled_connection_evicted_pipeline_unaffected() {
        let h = PipelineHarness::new(100);
        let hub = Arc::new(BroadcastHub::new(HubConfig {
            outbox_capacity: 256,
            max_consecutive_drops: 64,
            ..HubConfig::default()
        }));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let relay = tokio::spawn(run_relay(
            h.bus.subscribe(EventFilter::all()),
            hub.clone(),
            shutdown_rx,
        ));

        let mut healthy = hub.register();
        let _stalled = hub.register();

        let mut received = Vec::new();
        for round in 0..5usize {
            let first = round * 100;
            h.pipeline
                .process_batch(batch_of(TOPIC, 0, first as i64, valid_payloads(first, 100)))
                .await
                .unwrap();

            let expected = ((round + 1) * 100) as u64;
            assert!(
                eventually(Duration::from_secs(5), || hub.snapshot().broadcasts == expected).await
            );
            received.extend(drain(&mut healthy.outbox));
        }

        assert_eq!(received, ids(0..500));

        let snapshot = hub.snapshot();
        assert_eq!(snapshot.evicted, 1);
        assert_eq!(snapshot.connections, 1);
        assert_eq!(snapshot.dropped, 64);

        assert_eq!(h.consumer.commits().len(), 5);
        assert_eq!(h.consumer.committed(TOPIC, 0), Some(500));

        shutdown_tx.send(true).unwrap();
        relay.await.unwrap();
    }

    #[tokio::test]
    async fn test_refused_documents_are_not_broadcast() {
        let h = PipelineHarness::new(100);
        h.store.refuse_event("evt-3", "document_parsing_exception");
        let hub = Arc::new(BroadcastHub::new(HubConfig::default()));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let relay = tokio::spawn(run_relay(
            h.bus.subscribe(EventFilter::all()),
            hub.clone(),
            shutdown_rx,
        ));
        let mut reg = hub.register();

        h.pipeline
            .process_batch(batch_of(TOPIC, 0, 0, valid_payloads(0, 6)))
            .await
            .unwrap();

        assert!(eventually(Duration::from_secs(5), || hub.snapshot().broadcasts == 5).await);
        assert_eq!(
            drain(&mut reg.outbox),
            vec!["evt-0", "evt-1", "evt-2", "evt-4", "evt-5"]
        );
        assert_eq!(h.stats.snapshot().rejected, 1);

        shutdown_tx.send(true).unwrap();
        relay.await.unwrap();
    }
}
