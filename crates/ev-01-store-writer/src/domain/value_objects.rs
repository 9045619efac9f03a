//! # Value Objects
//!
//! Writer configuration and the retry schedule.

use std::time::Duration;

use crate::domain::schema::DEFAULT_INDEX;

/// Exponential backoff for retryable store failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// No retries at all.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (1-based): doubles each time, capped.
    #[must_use]
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Store writer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterConfig {
    /// Target index.
    pub index: String,
    pub retry: RetryPolicy,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            index: DEFAULT_INDEX.to_string(),
            retry: RetryPolicy::default(),
        }
    }
}
