use std::time::Duration;
use thiserror::Error;

/// Per-connection transport failures. Never propagated past the hub.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HubError {
    #[error("Transport send failed: {0}")]
    Transport(String),

    #[error("Transport send timed out after {0:?}")]
    SendTimeout(Duration),

    #[error("Connection closed")]
    Closed,

    #[error("Failed to encode frame: {0}")]
    Encode(String),
}
