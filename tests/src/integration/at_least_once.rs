//! # At-Least-Once Ingestion
//!
//! Offsets are committed only after every window of a batch is durable;
//! malformed input is isolated; redelivery is harmless.

#[cfg(test)]
mod tests {
    use crate::fixtures::{PipelineHarness, TOPIC};
    use ev_01_store_writer::{StoreError, StoreOp, DEFAULT_INDEX};
    use ev_03_ingestion::test_utils::{batch_of, malformed_payload, valid_payloads};
    use ev_03_ingestion::PipelineError;
    use shared_bus::{EventFilter, IngestEvent};

    // =========================================================================
    // WINDOWING AND COMMIT ORDER
    // =========================================================================

    #[tokio::test]
    async fn test_250_events_three_flushes_then_single_commit() {
        let h = PipelineHarness::new(100);
        let mut sub = h.bus.subscribe(EventFilter::all());

        h.pipeline
            .process_batch(batch_of(TOPIC, 0, 0, valid_payloads(0, 250)))
            .await
            .unwrap();

        assert_eq!(h.writer.windows(), vec![100, 100, 50]);

        // bus order mirrors pipeline order: three windows, then the commit
        let mut sequence = Vec::new();
        while let Ok(Some(event)) = sub.try_recv() {
            sequence.push(match event {
                IngestEvent::WindowIndexed { events, .. } => format!("window:{}", events.len()),
                IngestEvent::BatchCommitted { offsets } => format!("commit:{}", offsets[0].offset),
                IngestEvent::BatchFailed { .. } => "failed".to_string(),
            });
        }
        assert_eq!(
            sequence,
            vec!["window:100", "window:100", "window:50", "commit:250"]
        );
        assert_eq!(h.consumer.commits().len(), 1);
    }

    #[tokio::test]
    async fn test_message_37_invalid_in_250() {
        let h = PipelineHarness::new(100);
        let mut payloads = valid_payloads(0, 250);
        payloads[37] = malformed_payload();

        h.pipeline
            .process_batch(batch_of(TOPIC, 0, 500, payloads))
            .await
            .unwrap();

        let stats = h.stats.snapshot();
        assert_eq!(stats.processed, 249);
        assert_eq!(stats.errors, 1);
        assert_eq!(h.documents(), 249);
        assert_eq!(h.consumer.committed(TOPIC, 0), Some(750));
    }

    #[tokio::test]
    async fn test_interleaved_malformed_messages_are_isolated() {
        let h = PipelineHarness::new(10);
        let payloads: Vec<Vec<u8>> = (0..60)
            .map(|n| {
                if n % 4 == 3 {
                    malformed_payload()
                } else {
                    ev_03_ingestion::test_utils::valid_payload(n)
                }
            })
            .collect();

        h.pipeline
            .process_batch(batch_of(TOPIC, 1, 0, payloads))
            .await
            .unwrap();

        let stats = h.stats.snapshot();
        assert_eq!(stats.errors, 15);
        assert_eq!(stats.processed, 45);
        assert_eq!(stats.indexed, 45);
        assert_eq!(h.documents(), 45);
        assert!(h.store.document(DEFAULT_INDEX, "evt-2").is_some());
        assert!(h.store.document(DEFAULT_INDEX, "evt-3").is_none());
        assert_eq!(h.consumer.committed(TOPIC, 1), Some(60));
    }

    // =========================================================================
    // FAILURE SEMANTICS
    // =========================================================================

    #[tokio::test]
    async fn test_write_failure_in_last_window_blocks_commit() {
        let h = PipelineHarness::new(100);
        h.writer.fail_write(2);

        let result = h
            .pipeline
            .process_batch(batch_of(TOPIC, 0, 0, valid_payloads(0, 250)))
            .await;

        assert!(matches!(result, Err(PipelineError::Store(_))));
        assert!(h.consumer.commits().is_empty());
        // the first two windows are durable and will simply be overwritten on redelivery
        assert_eq!(h.documents(), 200);
    }

    #[tokio::test]
    async fn test_redelivery_after_failure_converges() {
        let h = PipelineHarness::new(100);
        let batch = batch_of(TOPIC, 0, 0, valid_payloads(0, 250));
        h.store.fail_next(
            StoreOp::Bulk,
            StoreError::Server {
                status: 503,
                body: "unavailable".to_string(),
            },
        );

        assert!(h.pipeline.process_batch(batch.clone()).await.is_err());
        assert!(h.consumer.commits().is_empty());

        h.pipeline.process_batch(batch).await.unwrap();
        assert_eq!(h.documents(), 250);
        assert_eq!(h.consumer.committed(TOPIC, 0), Some(250));
    }

    #[tokio::test]
    async fn test_same_event_id_twice_leaves_one_document() {
        let h = PipelineHarness::new(100);
        let first = batch_of(TOPIC, 0, 0, valid_payloads(7, 1));
        let again = batch_of(TOPIC, 0, 1, valid_payloads(7, 1));

        h.pipeline.process_batch(first).await.unwrap();
        h.pipeline.process_batch(again).await.unwrap();

        assert_eq!(h.documents(), 1);
        assert_eq!(h.stats.snapshot().indexed, 2);
        assert_eq!(h.consumer.committed(TOPIC, 0), Some(2));
    }
}
