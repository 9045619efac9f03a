//! # Log Messages
//!
//! Broker-agnostic view of what the log delivers.

/// One record read from the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<Vec<u8>>,
    /// `None` for tombstones.
    pub payload: Option<Vec<u8>>,
    /// Broker timestamp in milliseconds since the epoch, when known.
    pub timestamp: Option<i64>,
}

impl LogMessage {
    #[must_use]
    pub fn new(topic: impl Into<String>, partition: i32, offset: i64, payload: Vec<u8>) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
            key: None,
            payload: Some(payload),
            timestamp: None,
        }
    }
}

/// Messages delivered together, in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageBatch {
    pub messages: Vec<LogMessage>,
}

impl MessageBatch {
    #[must_use]
    pub fn new(messages: Vec<LogMessage>) -> Self {
        Self { messages }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
