//! # Offset Tracking
//!
//! Collects the messages of one batch that are resolved (indexed or
//! deliberately dropped) and turns them into commit positions.

use shared_bus::PartitionOffset;
use std::collections::BTreeMap;

/// Highest resolved offset per (topic, partition).
#[derive(Debug, Default)]
pub struct OffsetTracker {
    resolved: BTreeMap<(String, i32), i64>,
}

impl OffsetTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `offset` on `topic`/`partition` as resolved.
    ///
    /// Positions never move backwards, whatever order offsets arrive in.
    pub fn resolve(&mut self, topic: &str, partition: i32, offset: i64) {
        self.resolved
            .entry((topic.to_string(), partition))
            .and_modify(|high| *high = (*high).max(offset))
            .or_insert(offset);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }

    /// Positions to commit: next offset to read, per partition.
    #[must_use]
    pub fn commit_positions(&self) -> Vec<PartitionOffset> {
        self.resolved
            .iter()
            .map(|((topic, partition), offset)| PartitionOffset {
                topic: topic.clone(),
                partition: *partition,
                offset: offset + 1,
            })
            .collect()
    }
}
