//! # Ingestion Stats
//!
//! Monotonic counters shared by every pipeline instance.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free ingestion counters.
#[derive(Debug, Default)]
pub struct IngestStats {
    processed: AtomicU64,
    indexed: AtomicU64,
    rejected: AtomicU64,
    errors: AtomicU64,
}

/// Point-in-time copy of [`IngestStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Messages parsed and transformed.
    pub processed: u64,
    /// Documents the store confirmed.
    pub indexed: u64,
    /// Documents the store refused individually.
    pub rejected: u64,
    /// Messages that could not be parsed.
    pub errors: u64,
}

impl IngestStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write(&self, indexed: usize, rejected: usize) {
        self.indexed.fetch_add(indexed as u64, Ordering::Relaxed);
        self.rejected.fetch_add(rejected as u64, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            indexed: self.indexed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}
