//! # Outbound Ports
//!
//! The write half of a live connection.

use async_trait::async_trait;

use crate::domain::HubError;

/// Where a connection's frames end up (a WebSocket, a test recorder).
#[async_trait]
pub trait ConnectionSink: Send {
    /// Push one text frame to the peer.
    async fn send(&mut self, frame: &str) -> Result<(), HubError>;

    /// Close the transport. Best effort.
    async fn close(&mut self) {}
}
