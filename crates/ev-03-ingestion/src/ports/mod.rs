//! Ports layer for the ingestion pipeline.

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
