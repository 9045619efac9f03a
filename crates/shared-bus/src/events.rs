//! # Flush Events
//!
//! What the pipeline announces after each durable step.

use serde::{Deserialize, Serialize};
use shared_types::ProcessedEvent;
use std::sync::Arc;

/// Commit position for one partition (`last resolved offset + 1`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartitionOffset {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

/// Events published by the ingestion pipeline.
#[derive(Debug, Clone)]
pub enum IngestEvent {
    /// A window was accepted by the store.
    ///
    /// `events` holds only the documents the store confirmed, in window order.
    WindowIndexed {
        events: Arc<[ProcessedEvent]>,
        rejected: usize,
    },

    /// Offsets for a whole batch were committed.
    BatchCommitted { offsets: Vec<PartitionOffset> },

    /// A batch was abandoned before commit and will be redelivered.
    BatchFailed { reason: String },
}

impl IngestEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::WindowIndexed { .. } => EventTopic::Indexed,
            Self::BatchCommitted { .. } => EventTopic::Commits,
            Self::BatchFailed { .. } => EventTopic::Failures,
        }
    }

    /// Number of documents carried by the event.
    #[must_use]
    pub fn document_count(&self) -> usize {
        match self {
            Self::WindowIndexed { events, .. } => events.len(),
            _ => 0,
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Windows durably written to the store.
    Indexed,
    /// Offset commits.
    Commits,
    /// Abandoned batches.
    Failures,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self { topics }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &IngestEvent) -> bool {
        self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic())
    }
}
