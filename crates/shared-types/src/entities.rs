//! # Core Domain Entities
//!
//! The analytics event as it travels through the system.
//!
//! ## Lifecycle
//!
//! ```text
//! log payload ──parse──→ RawEvent ──transform──→ ProcessedEvent ──→ store / live fan-out
//! ```
//!
//! `RawEvent` is untrusted producer input. `ProcessedEvent` is the stored
//! document: it always carries an `eventId`, which is also the document
//! identifier in the store (re-indexing the same id overwrites).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::EventParseError;

/// Open-schema property bag. Insertion order is preserved.
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// User identifier as sent by the producer.
///
/// Producers emit either numeric ids or opaque strings (`"user_42"`,
/// `"anonymous"`). The value is kept exactly as received.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    /// Integral user id.
    Numeric(i64),
    /// Any other string id.
    Text(String),
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Numeric(id) => write!(f, "{}", id),
            Self::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self::Numeric(id)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_string())
    }
}

/// Producer metadata attached to a raw event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EventMetadata {
    /// Emitting surface (`web`, `mobile-ios`, `api`, ...).
    pub source: String,
    /// Producer schema version.
    pub version: String,
    /// Ignored on input; the transform always sets its own value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<String>,
}

/// An analytics event as read from the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawEvent {
    /// Producer-assigned id. Absent or empty ids are filled by the transform.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    pub user_id: UserId,
    pub session_id: String,
    pub event_type: String,
    /// ISO-8601 timestamp, kept verbatim.
    pub timestamp: String,
    #[serde(default)]
    pub properties: Properties,
    pub metadata: EventMetadata,
}

impl RawEvent {
    /// Parse and validate a log payload.
    ///
    /// Rejects invalid JSON, missing or mistyped fields, unknown top-level
    /// fields and timestamps that are not RFC 3339.
    pub fn from_json_bytes(payload: &[u8]) -> Result<Self, EventParseError> {
        let event: RawEvent = serde_json::from_slice(payload)
            .map_err(|e| EventParseError::Json(e.to_string()))?;

        if DateTime::parse_from_rfc3339(&event.timestamp).is_err() {
            return Err(EventParseError::InvalidTimestamp(event.timestamp));
        }

        Ok(event)
    }

    /// The producer id if it is usable as a document id.
    #[must_use]
    pub fn usable_event_id(&self) -> Option<&str> {
        self.event_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Metadata of a processed event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProcessedMetadata {
    pub source: String,
    pub version: String,
    /// When the transform ran.
    pub processed_at: DateTime<Utc>,
}

/// The stored and broadcast form of an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProcessedEvent {
    /// Always present; doubles as the store document id.
    pub event_id: String,
    pub user_id: UserId,
    pub session_id: String,
    pub event_type: String,
    pub timestamp: String,
    pub properties: Properties,
    pub metadata: ProcessedMetadata,
    pub indexed_at: DateTime<Utc>,
    /// Wall time of the transform step only.
    pub processing_time_ms: u64,
}
