//! # Error Types
//!
//! Errors raised while reading untrusted event payloads.

use thiserror::Error;

/// A log payload that cannot become a `RawEvent`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventParseError {
    /// Not JSON, or JSON that does not match the event shape.
    #[error("Malformed event payload: {0}")]
    Json(String),

    /// `timestamp` is not an ISO-8601 / RFC 3339 instant.
    #[error("Invalid event timestamp: {0}")]
    InvalidTimestamp(String),
}
