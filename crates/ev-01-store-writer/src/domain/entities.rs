//! # Write Outcomes
//!
//! What a bulk write reports back, per document and in aggregate.

use serde::{Deserialize, Serialize};
use shared_types::ProcessedEvent;
use std::collections::HashSet;

/// Store verdict for one document of a bulk request, in request order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItemResult {
    pub id: String,
    /// `None` when the store accepted the document.
    pub error: Option<String>,
}

impl BulkItemResult {
    pub fn ok(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            error: None,
        }
    }

    pub fn failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            error: Some(reason.into()),
        }
    }
}

/// A document the store refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentFailure {
    /// Position in the submitted batch.
    pub position: usize,
    pub event_id: String,
    pub reason: String,
}

/// Result of writing one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOutcome {
    /// Documents the store confirmed.
    pub successful: usize,
    /// Documents the store refused.
    pub failed: usize,
    /// Wall time of the write, retries included.
    pub elapsed_ms: u64,
    pub failures: Vec<DocumentFailure>,
}

impl WriteOutcome {
    /// Outcome of an empty batch.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build an outcome from per-item results aligned with the submitted batch.
    #[must_use]
    pub fn from_items(items: &[BulkItemResult], elapsed_ms: u64) -> Self {
        let failures: Vec<DocumentFailure> = items
            .iter()
            .enumerate()
            .filter_map(|(position, item)| {
                item.error.as_ref().map(|reason| DocumentFailure {
                    position,
                    event_id: item.id.clone(),
                    reason: reason.clone(),
                })
            })
            .collect();

        Self {
            successful: items.len() - failures.len(),
            failed: failures.len(),
            elapsed_ms,
            failures,
        }
    }

    /// True when every document was confirmed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }

    /// The confirmed documents of `batch`, in order.
    ///
    /// `batch` must be the slice this outcome was produced for.
    pub fn confirmed<'a>(
        &self,
        batch: &'a [ProcessedEvent],
    ) -> impl Iterator<Item = &'a ProcessedEvent> + 'a {
        let refused: HashSet<usize> = self.failures.iter().map(|f| f.position).collect();
        batch
            .iter()
            .enumerate()
            .filter(move |(position, _)| !refused.contains(position))
            .map(|(_, event)| event)
    }

    /// Owned variant of [`WriteOutcome::confirmed`].
    #[must_use]
    pub fn into_confirmed(&self, batch: Vec<ProcessedEvent>) -> Vec<ProcessedEvent> {
        if self.is_complete() {
            return batch;
        }
        let refused: HashSet<usize> = self.failures.iter().map(|f| f.position).collect();
        batch
            .into_iter()
            .enumerate()
            .filter(|(position, _)| !refused.contains(position))
            .map(|(_, event)| event)
            .collect()
    }
}

/// Cluster health as reported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterStatus {
    Green,
    Yellow,
    Red,
}

impl ClusterStatus {
    /// Anything but red can take writes.
    #[must_use]
    pub fn is_serving(self) -> bool {
        self != Self::Red
    }
}
