//! # Live Transport Frames
//!
//! JSON frames exchanged with live subscribers.
//!
//! Outbound: `{"type": "event" | "stats" | "error", "payload": ...}`
//! Inbound:  `{"type": "subscribe"}` or `{"type": "ping"}`

use serde::{Deserialize, Serialize};

use crate::entities::ProcessedEvent;

/// Payload of a `stats` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubStats {
    /// Currently registered connections.
    pub clients: usize,
}

/// Payload of an `error` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
}

/// A frame pushed to a subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum StreamMessage {
    Event(Box<ProcessedEvent>),
    Stats(HubStats),
    Error(ErrorPayload),
}

/// Borrowing twin of `StreamMessage::Event` so fan-out can encode without cloning.
#[derive(Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
enum EventFrame<'a> {
    Event(&'a ProcessedEvent),
}

impl StreamMessage {
    /// Encode this frame as JSON text.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Encode an `event` frame for `event` without taking ownership.
    pub fn encode_event(event: &ProcessedEvent) -> Result<String, serde_json::Error> {
        serde_json::to_string(&EventFrame::Event(event))
    }
}

/// A control frame sent by a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Subscribe,
    Ping,
}

impl ClientMessage {
    /// Parse an inbound frame. Unknown or malformed frames yield `None`.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }
}
