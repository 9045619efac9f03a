//! # Event Transform
//!
//! `RawEvent` → `ProcessedEvent`. Pure apart from reading the clock and the
//! random source for missing ids.

use chrono::Utc;
use shared_types::{ProcessedEvent, ProcessedMetadata, RawEvent};
use std::time::Instant;
use uuid::Uuid;

/// Enrich a raw event for storage.
///
/// - `eventId` is kept when present and non-empty, otherwise a UUID v4
/// - `indexedAt` and `metadata.processedAt` are both set to now
/// - `processingTimeMs` covers this call only
#[must_use]
pub fn transform(raw: RawEvent) -> ProcessedEvent {
    let started = Instant::now();
    let now = Utc::now();

    let event_id = raw
        .usable_event_id()
        .map_or_else(|| Uuid::new_v4().to_string(), str::to_owned);

    let mut event = ProcessedEvent {
        event_id,
        user_id: raw.user_id,
        session_id: raw.session_id,
        event_type: raw.event_type,
        timestamp: raw.timestamp,
        properties: raw.properties,
        metadata: ProcessedMetadata {
            source: raw.metadata.source,
            version: raw.metadata.version,
            processed_at: now,
        },
        indexed_at: now,
        processing_time_ms: 0,
    };
    event.processing_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    event
}
