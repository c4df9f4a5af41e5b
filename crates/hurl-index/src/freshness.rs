use std::time::{Duration, Instant};

/// Age tracking for the read connection.
///
/// A connection is stale once `refresh_after` has elapsed since it was
/// opened or last refreshed. Every read entry point asks this one policy.
#[derive(Clone, Copy, Debug)]
pub struct ConnectionFreshness {
    refreshed_at: Instant,
    refresh_after: Duration,
}

impl ConnectionFreshness {
    pub fn new(refresh_after: Duration) -> Self {
        Self::starting_at(Instant::now(), refresh_after)
    }

    pub fn starting_at(refreshed_at: Instant, refresh_after: Duration) -> Self {
        Self {
            refreshed_at,
            refresh_after,
        }
    }

    pub fn is_stale(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.refreshed_at) >= self.refresh_after
    }

    pub fn mark_refreshed(&mut self, now: Instant) {
        self.refreshed_at = now;
    }

    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.refreshed_at)
    }
}
