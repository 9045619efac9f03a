//! # Event Stream Pipeline Benchmarks
//!
//! Hot paths on the ingest side:
//!
//! | Area | Path |
//! |------|------|
//! | Ingestion | parse + transform of one message |
//! | Ingestion | window fill and offset resolution |
//! | Wire | event frame encoding |
//! | Live | broadcast to N registered connections |

use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ev_02_broadcast_hub::{BroadcastHub, HubConfig};
use ev_03_ingestion::test_utils::valid_payload;
use ev_03_ingestion::{transform, BatchWindow, OffsetTracker};
use rand::Rng;
use shared_types::{RawEvent, StreamMessage};

// ============================================================================
// INGESTION
// ============================================================================

fn bench_parse_and_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingestion-transform");
    group.measurement_time(Duration::from_secs(5));

    let payload = valid_payload(42);
    group.throughput(Throughput::Bytes(payload.len() as u64));
    group.bench_function("parse_transform_single", |b| {
        b.iter(|| {
            let raw = RawEvent::from_json_bytes(black_box(&payload)).ok();
            black_box(raw.map(transform))
        })
    });

    group.finish();
}

fn bench_window_and_offsets(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingestion-window");

    let mut rng = rand::thread_rng();
    for size in [100usize, 500, 1000] {
        let events: Vec<_> = (0..size)
            .filter_map(|n| RawEvent::from_json_bytes(&valid_payload(n)).ok())
            .map(transform)
            .collect();
        let partitions: Vec<i32> = (0..size).map(|_| rng.gen_range(0..6)).collect();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("fill_and_resolve", size), &size, |b, _| {
            b.iter(|| {
                let mut window = BatchWindow::new(100);
                let mut offsets = OffsetTracker::new();
                let mut flushed = 0usize;
                for (offset, (event, partition)) in events.iter().zip(&partitions).enumerate() {
                    window.push(event.clone());
                    offsets.resolve("analytics-events", *partition, offset as i64);
                    if window.is_full() {
                        flushed += window.take().len();
                    }
                }
                black_box((flushed, offsets.commit_positions()))
            })
        });
    }

    group.finish();
}

// ============================================================================
// LIVE
// ============================================================================

fn bench_frame_encoding(c: &mut Criterion) {
    let event = RawEvent::from_json_bytes(&valid_payload(7))
        .map(transform)
        .expect("fixture payload is valid");

    c.bench_function("wire-encode-event-frame", |b| {
        b.iter(|| black_box(StreamMessage::encode_event(black_box(&event))))
    });
}

fn bench_hub_broadcast(c: &mut Criterion) {
    let mut group = c.benchmark_group("live-broadcast");

    let event = Arc::new(
        RawEvent::from_json_bytes(&valid_payload(7))
            .map(transform)
            .expect("fixture payload is valid"),
    );

    for connections in [1usize, 10, 100] {
        let hub = BroadcastHub::new(HubConfig::default());
        let mut registrations: Vec<_> = (0..connections).map(|_| hub.register()).collect();

        group.throughput(Throughput::Elements(connections as u64));
        group.bench_with_input(
            BenchmarkId::new("broadcast_one", connections),
            &connections,
            |b, _| {
                b.iter(|| {
                    let delivered = hub.broadcast(event.clone());
                    // keep outboxes empty so nothing is dropped or evicted
                    for reg in &mut registrations {
                        while reg.outbox.try_recv().is_ok() {}
                    }
                    black_box(delivered)
                })
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_parse_and_transform,
    bench_window_and_offsets,
    bench_frame_encoding,
    bench_hub_broadcast,
);

criterion_main!(benches);
