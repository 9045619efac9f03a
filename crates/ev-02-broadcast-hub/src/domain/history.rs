//! # History Ring
//!
//! Fixed-capacity FIFO of the most recently broadcast events. Oldest entries
//! are evicted silently; this is a cache, not a log.

use shared_types::ProcessedEvent;
use std::collections::VecDeque;
use std::sync::Arc;

use super::Frame;

/// A broadcast event together with its encoded frame.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub event: Arc<ProcessedEvent>,
    pub frame: Frame,
}

/// Bounded recent-history buffer.
#[derive(Debug)]
pub struct HistoryRing {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl HistoryRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append, evicting the oldest entry when full.
    pub fn push(&mut self, entry: HistoryEntry) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// The newest `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &HistoryEntry> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared_types::{ProcessedMetadata, Properties, UserId};

    fn entry(id: usize) -> HistoryEntry {
        let event = ProcessedEvent {
            event_id: id.to_string(),
            user_id: UserId::Numeric(1),
            session_id: "s".to_string(),
            event_type: "page_view".to_string(),
            timestamp: "2024-05-01T10:00:00Z".to_string(),
            properties: Properties::new(),
            metadata: ProcessedMetadata {
                source: "web".to_string(),
                version: "1".to_string(),
                processed_at: Utc::now(),
            },
            indexed_at: Utc::now(),
            processing_time_ms: 0,
        };
        HistoryEntry {
            event: Arc::new(event),
            frame: Arc::from(id.to_string()),
        }
    }

    fn ids<'a>(entries: impl Iterator<Item = &'a HistoryEntry>) -> Vec<String> {
        entries.map(|e| e.event.event_id.clone()).collect()
    }

    #[test]
    fn test_evicts_oldest() {
        let mut ring = HistoryRing::new(3);
        for i in 0..5 {
            ring.push(entry(i));
        }
        assert_eq!(ring.len(), 3);
        assert_eq!(ids(ring.recent(10)), vec!["2", "3", "4"]);
    }

    #[test]
    fn test_recent_is_chronological() {
        let mut ring = HistoryRing::new(10);
        for i in 0..6 {
            ring.push(entry(i));
        }
        assert_eq!(ids(ring.recent(2)), vec!["4", "5"]);
        assert_eq!(ids(ring.recent(0)), Vec::<String>::new());
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let mut ring = HistoryRing::new(0);
        ring.push(entry(1));
        assert!(ring.is_empty());
    }
}
