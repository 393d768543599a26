//! Sync engine configuration

use std::time::Duration;

/// Configuration for the sync engine
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Maximum rows fetched per entity table during a pull (most recently
    /// updated first). Rows beyond the cap are not refreshed locally.
    pub pull_limit: u32,
    /// Interval between periodic background syncs
    pub sync_interval: Duration,
    /// Upper bound for a single remote call; a timeout counts as a
    /// per-entry failure, not a global abort
    pub remote_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            pull_limit: 100,
            sync_interval: Duration::from_secs(60),
            remote_timeout: Duration::from_secs(30),
        }
    }
}

impl SyncConfig {
    /// Set the per-table pull cap
    #[must_use]
    pub const fn with_pull_limit(mut self, limit: u32) -> Self {
        self.pull_limit = limit;
        self
    }

    /// Set the periodic sync interval
    #[must_use]
    pub const fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval;
        self
    }

    /// Set the per-call remote timeout
    #[must_use]
    pub const fn with_remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_bounds() {
        let config = SyncConfig::default();
        assert_eq!(config.pull_limit, 100);
        assert!(config.remote_timeout < config.sync_interval * 2);
    }

    #[test]
    fn builder_methods_override_defaults() {
        let config = SyncConfig::default()
            .with_pull_limit(25)
            .with_sync_interval(Duration::from_secs(10))
            .with_remote_timeout(Duration::from_secs(5));
        assert_eq!(config.pull_limit, 25);
        assert_eq!(config.sync_interval, Duration::from_secs(10));
        assert_eq!(config.remote_timeout, Duration::from_secs(5));
    }
}
