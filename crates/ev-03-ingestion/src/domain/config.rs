//! # Pipeline Configuration

use std::time::Duration;

pub const DEFAULT_FLUSH_THRESHOLD: usize = 100;
pub const DEFAULT_MAX_RECEIVE_RETRIES: u32 = 8;
pub const DEFAULT_RECEIVE_BACKOFF: Duration = Duration::from_millis(100);
const MAX_RECEIVE_BACKOFF: Duration = Duration::from_secs(30);

/// Pipeline tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Window size that triggers a flush.
    pub flush_threshold: usize,
    /// Consecutive receive failures tolerated before `run` gives up.
    pub max_receive_retries: u32,
    /// First wait after a receive failure; doubles per consecutive failure.
    pub receive_backoff: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            max_receive_retries: DEFAULT_MAX_RECEIVE_RETRIES,
            receive_backoff: DEFAULT_RECEIVE_BACKOFF,
        }
    }
}

impl PipelineConfig {
    #[must_use]
    pub fn with_flush_threshold(mut self, threshold: usize) -> Self {
        self.flush_threshold = threshold;
        self
    }

    /// Wait before the `failures`-th consecutive receive retry (1-based).
    #[must_use]
    pub fn receive_delay(&self, failures: u32) -> Duration {
        let factor = 1u32 << failures.saturating_sub(1).min(16);
        self.receive_backoff
            .saturating_mul(factor)
            .min(MAX_RECEIVE_BACKOFF)
    }
}
