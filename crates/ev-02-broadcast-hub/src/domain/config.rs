use std::time::Duration;

/// Default number of recent events kept for replay and inspection.
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// Default number of events replayed to a new connection.
pub const DEFAULT_REPLAY_COUNT: usize = 50;

/// Default per-connection outbox size.
pub const DEFAULT_OUTBOX_CAPACITY: usize = 256;

/// Hub configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    pub history_capacity: usize,
    pub replay_count: usize,
    /// Frames queued per connection before new ones are dropped for it.
    /// Never smaller than `replay_count`.
    pub outbox_capacity: usize,
    /// Consecutive dropped frames after which a connection is evicted.
    pub max_consecutive_drops: u32,
    /// Upper bound for a single transport send.
    pub send_timeout: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            replay_count: DEFAULT_REPLAY_COUNT,
            outbox_capacity: DEFAULT_OUTBOX_CAPACITY,
            max_consecutive_drops: 64,
            send_timeout: Duration::from_secs(5),
        }
    }
}

impl HubConfig {
    /// Outbox size actually used: room for a full replay is guaranteed.
    #[must_use]
    pub fn effective_outbox_capacity(&self) -> usize {
        self.outbox_capacity.max(self.replay_count).max(1)
    }

    /// Replay size actually used: never more than the history holds.
    #[must_use]
    pub fn effective_replay_count(&self) -> usize {
        self.replay_count.min(self.history_capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbox_fits_replay() {
        let config = HubConfig {
            outbox_capacity: 10,
            replay_count: 50,
            ..HubConfig::default()
        };
        assert_eq!(config.effective_outbox_capacity(), 50);
        assert_eq!(HubConfig::default().effective_outbox_capacity(), 256);
    }

    #[test]
    fn test_replay_bounded_by_history() {
        let config = HubConfig {
            history_capacity: 5,
            ..HubConfig::default()
        };
        assert_eq!(config.effective_replay_count(), 5);
    }
}
