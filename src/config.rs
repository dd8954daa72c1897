//! Configuration Module
//!
//! Options recognized when constructing a cache backend.

use std::env;
use std::time::Duration;

/// Default maximum number of entries.
pub const DEFAULT_SIZE: usize = 1000;

/// Default interval between background sweeps.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Cache backend configuration.
///
/// Consumed once by [`MemoryBackend::new`](crate::MemoryBackend::new) and
/// never mutated afterward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries the store can hold
    pub size: usize,
    /// Enables per-key-template usage counters
    pub count_stat: bool,
    /// Interval between background sweeps; zero disables the sweeper
    pub check_interval: Duration,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_SIZE` - Maximum cache entries (default: 1000)
    /// - `CACHE_COUNT_STAT` - `true`/`1` enables usage counters (default: false)
    /// - `CACHE_CHECK_INTERVAL_MS` - Sweep frequency in milliseconds (default: 1000)
    pub fn from_env() -> Self {
        Self {
            size: env::var("CACHE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SIZE),
            count_stat: env::var("CACHE_COUNT_STAT")
                .ok()
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            check_interval: env::var("CACHE_CHECK_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_CHECK_INTERVAL),
        }
    }

    /// Sets the maximum number of entries.
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Enables or disables usage counters.
    pub fn with_count_stat(mut self, count_stat: bool) -> Self {
        self.count_stat = count_stat;
        self
    }

    /// Sets the sweep interval.
    pub fn with_check_interval(mut self, check_interval: Duration) -> Self {
        self.check_interval = check_interval;
        self
    }

    /// Returns true if a background sweeper should run.
    pub fn sweeper_enabled(&self) -> bool {
        !self.check_interval.is_zero()
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_SIZE,
            count_stat: false,
            check_interval: DEFAULT_CHECK_INTERVAL,
        }
    }
}
