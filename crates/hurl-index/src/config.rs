use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default staleness window of the read connection.
pub const DEFAULT_REFRESH_AFTER: Duration = Duration::from_secs(30 * 60);

/// Tuning knobs for a [`PackageIndex`](crate::PackageIndex).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Maximum age of the read snapshot before it is reopened.
    pub refresh_after: Duration,
    /// Results per page.
    pub page_size: usize,
    /// Matches ranked before collapsing. Match counts beyond this are
    /// reported as estimates.
    pub candidate_window: usize,
    /// Memory budget of the write connection, in bytes.
    pub writer_memory: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            refresh_after: DEFAULT_REFRESH_AFTER,
            page_size: 10,
            candidate_window: 1_000,
            writer_memory: 50_000_000,
        }
    }
}

impl IndexConfig {
    pub fn with_refresh_minutes(mut self, minutes: u64) -> Self {
        self.refresh_after = Duration::from_secs(minutes * 60);
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}
