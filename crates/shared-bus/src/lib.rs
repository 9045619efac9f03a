//! # Shared Bus - Flush Events Between Pipeline and Consumers
//!
//! The ingestion pipeline publishes one event per flushed window; anything
//! interested in freshly indexed documents subscribes here instead of being
//! called by the pipeline.
//!
//! ```text
//! ┌──────────────────┐   publish()    ┌──────────────┐   subscribe()   ┌───────────────┐
//! │ Ingestion        │ ─────────────→ │  Flush Bus   │ ──────────────→ │ Broadcast Hub │
//! │ Pipeline         │                │              │                 │ relay         │
//! └──────────────────┘                └──────────────┘                 └───────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - Publishing never blocks and never fails the publisher: no subscribers,
//!   or subscribers that fell behind, only lose events on their side.
//! - A lagging subscriber skips the events it missed and keeps going.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{EventFilter, EventTopic, IngestEvent, PartitionOffset};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before it starts lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
