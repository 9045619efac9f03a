//! # Shared Types Crate
//!
//! The event data contract shared by the ingestion pipeline, the store
//! writer and the broadcast hub.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every crate reads and writes events through
//!   these types; no crate defines its own event shape.
//! - **Untrusted input stays typed**: `userId` is a tagged union and the
//!   property bag is an ordered JSON map, never a fixed schema.
//! - **Strict documents**: `ProcessedEvent` rejects unknown top-level fields,
//!   matching the store mapping.

pub mod entities;
pub mod errors;
pub mod wire;

pub use entities::*;
pub use errors::*;
pub use wire::*;
