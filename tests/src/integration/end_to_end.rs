//! # End-to-End
//!
//! The assembled container: several pipelines share one writer, one flush
//! bus and one hub, exactly as the runtime wires them.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::fixtures::{drain, eventually, TOPIC};
    use ev_01_store_writer::{InMemoryStore, StoreError, StoreOp, DEFAULT_INDEX};
    use ev_03_ingestion::test_utils::{batch_of, malformed_payload, valid_payloads, ScriptedConsumer};
    use ev_03_ingestion::{BrokerError, PipelineError};
    use ingest_runtime::wiring::{collect_report, run_relay};
    use ingest_runtime::{IngestConfig, IngestContainer};
    use shared_bus::{EventFilter, EventTopic};
    use tokio::sync::watch;

    fn container(store: InMemoryStore) -> IngestContainer<InMemoryStore> {
        let mut config = IngestConfig::default();
        config.pipeline = config.pipeline.with_flush_threshold(100);
        config.store.max_retries = 0;
        IngestContainer::new(config, store)
    }

    // =========================================================================
    // HAPPY PATH
    // =========================================================================

    #[tokio::test]
    async fn test_two_partitions_two_pipelines() {
        let store = InMemoryStore::new();
        let c = container(store.clone());
        c.writer.initialize().await.unwrap();

        let left = ScriptedConsumer::new();
        let right = ScriptedConsumer::new();
        left.push_batch(batch_of(TOPIC, 0, 0, valid_payloads(0, 150)));
        let mut tail = valid_payloads(150, 150);
        tail[10] = malformed_payload();
        right.push_batch(batch_of(TOPIC, 1, 0, tail));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let relay = tokio::spawn(run_relay(
            c.bus.subscribe(EventFilter::all()),
            c.hub.clone(),
            shutdown_rx,
        ));
        let mut live = c.hub.register();

        let pipelines = c.pipelines(vec![left.clone(), right.clone()]);
        let handles: Vec<_> = pipelines
            .iter()
            .map(|p| {
                let p = Arc::clone(p);
                tokio::spawn(async move { p.run().await })
            })
            .collect();

        assert!(
            eventually(Duration::from_secs(5), || {
                left.committed(TOPIC, 0).is_some() && right.committed(TOPIC, 1).is_some()
            })
            .await
        );
        assert!(eventually(Duration::from_secs(5), || c.hub.snapshot().broadcasts == 299).await);

        for p in &pipelines {
            p.stop();
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(left.committed(TOPIC, 0), Some(150));
        assert_eq!(right.committed(TOPIC, 1), Some(150));
        assert!(left.is_disconnected() && right.is_disconnected());
        assert_eq!(store.document_total(DEFAULT_INDEX), 299);
        assert_eq!(drain(&mut live.outbox).len(), 299);
        assert_eq!(c.hub.recent(1000).len(), 299);

        let report = collect_report(&c.writer, &c.stats, &c.hub).await;
        assert_eq!(report.ingestion.processed, 299);
        assert_eq!(report.ingestion.indexed, 299);
        assert_eq!(report.ingestion.errors, 1);
        assert_eq!(report.store.document_count, Some(299));
        assert_eq!(report.live.connected_clients, 1);

        shutdown_tx.send(true).unwrap();
        relay.await.unwrap();
    }

    // =========================================================================
    // FAILURE PATHS
    // =========================================================================

    #[tokio::test]
    async fn test_store_outage_stops_pipeline_without_commit() {
        let store = InMemoryStore::new();
        store.fail_always(StoreOp::Bulk, StoreError::Connection("refused".into()));
        let c = container(store.clone());

        let consumer = ScriptedConsumer::new();
        consumer.push_batch(batch_of(TOPIC, 0, 0, valid_payloads(0, 50)));
        let mut failures = c.bus.subscribe(EventFilter::topics(vec![EventTopic::Failures]));

        let pipeline = c.pipelines(vec![consumer.clone()]).remove(0);
        let result = pipeline.run().await;

        assert!(matches!(result, Err(PipelineError::Store(_))));
        assert!(consumer.commits().is_empty());
        assert!(consumer.is_disconnected());
        assert!(matches!(
            failures.try_recv(),
            Ok(Some(shared_bus::IngestEvent::BatchFailed { .. }))
        ));
        assert_eq!(c.hub.snapshot().broadcasts, 0);
    }

    #[tokio::test]
    async fn test_count_failure_keeps_report_alive() {
        let store = InMemoryStore::new();
        store.fail_always(StoreOp::Count, StoreError::Timeout);
        let c = container(store);

        let report = collect_report(&c.writer, &c.stats, &c.hub).await;
        assert_eq!(report.store.document_count, None);
        assert_eq!(report.ingestion.processed, 0);
    }

    #[tokio::test]
    async fn test_commit_failure_is_fatal() {
        let c = container(InMemoryStore::new());
        let consumer = ScriptedConsumer::new();
        consumer.push_batch(batch_of(TOPIC, 0, 0, valid_payloads(0, 10)));
        consumer.fail_commits(BrokerError::Commit("coordinator moved".into()));

        let pipeline = c.pipelines(vec![consumer.clone()]).remove(0);
        let result = pipeline.run().await;

        assert!(matches!(
            result,
            Err(PipelineError::Broker(BrokerError::Commit(_)))
        ));
        // documents are durable; redelivery overwrites them
        assert_eq!(c.writer.document_count().await.unwrap(), 10);
    }
}
