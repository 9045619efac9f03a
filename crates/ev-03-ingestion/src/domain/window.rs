//! # Batch Window
//!
//! The flush unit inside one log batch.

use shared_types::ProcessedEvent;

/// Processed events waiting to be written.
#[derive(Debug)]
pub struct BatchWindow {
    threshold: usize,
    events: Vec<ProcessedEvent>,
}

impl BatchWindow {
    /// A window that reports full at `threshold` events (at least 1).
    #[must_use]
    pub fn new(threshold: usize) -> Self {
        let threshold = threshold.max(1);
        Self {
            threshold,
            events: Vec::with_capacity(threshold),
        }
    }

    pub fn push(&mut self, event: ProcessedEvent) {
        self.events.push(event);
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.events.len() >= self.threshold
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Hand the accumulated events over and start empty.
    pub fn take(&mut self) -> Vec<ProcessedEvent> {
        std::mem::replace(&mut self.events, Vec::with_capacity(self.threshold))
    }
}
