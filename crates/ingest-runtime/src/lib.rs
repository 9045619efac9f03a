//! # Ingest Runtime Library
//!
//! This library exposes the internal modules of the ingestion service for
//! testing. The main entry point is the `main.rs` binary.
//!
//! - `container/` - configuration and shared services
//! - `wiring/` - live relay and stats reporter tasks
//! - `http/` - WebSocket, health, metrics and recent-events routes

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod container;
pub mod http;
pub mod wiring;

pub use container::{ConfigError, IngestConfig, IngestContainer};
