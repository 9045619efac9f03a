//! # Ports Layer
//!
//! - **Inbound** (`DocumentWriter`): what the ingestion pipeline calls.
//! - **Outbound** (`BulkStore`): what a store adapter implements.

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
