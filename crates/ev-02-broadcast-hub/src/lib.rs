//! # Broadcast Hub (ev-02)
//!
//! Best-effort live fan-out of indexed events.
//!
//! ## Responsibilities
//!
//! - Track live connections
//! - Keep a bounded ring of recently broadcast events
//! - Replay the newest events to a new connection before any live event
//! - Push each broadcast to every connection without waiting on any of them
//! - Answer `ping` with connection stats
//!
//! A slow or dead connection only ever loses its own frames; it cannot delay
//! other connections or the caller of `broadcast`.
//!
//! ## Hexagonal Architecture
//!
//! - **Domain Layer** (`domain/`): history ring, config, errors
//! - **Ports Layer** (`ports/`): `ConnectionSink`
//! - **Service** (`service.rs`): `BroadcastHub`, `pump_outbox`
//! - **Adapters Layer** (`adapters/`): axum WebSocket

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{handle_socket, upgrade, WebSocketSink};
pub use domain::{
    ConnectionId, Frame, HistoryEntry, HistoryRing, HubConfig, HubError,
    DEFAULT_HISTORY_CAPACITY, DEFAULT_OUTBOX_CAPACITY, DEFAULT_REPLAY_COUNT,
};
pub use ports::ConnectionSink;
pub use service::{pump_outbox, BroadcastHub, HubSnapshot, PumpExit, Registration};
