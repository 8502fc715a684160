//! Cache configuration.
//!
//! Resolved from the `[cache]` table of `sijil.toml` and `SIJIL__CACHE__*` variables.

use std::time::Duration;

use serde::Deserialize;

const DEFAULT_TTL_MS: u64 = 30_000;

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Serve repeated reads from the cache.
    pub enabled: bool,
    /// Time-to-live of a cached response in milliseconds.
    pub ttl_ms: u64,
    /// Emit a structured event for every hit, miss, store and invalidation.
    pub verbose_logging: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_ms: DEFAULT_TTL_MS,
            verbose_logging: false,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            ttl_ms: u64::try_from(settings.ttl.as_millis()).unwrap_or(u64::MAX),
            verbose_logging: settings.verbose_logging,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

/// Human-readable TTL, e.g. `30 seconds` or `2 minutes`.
pub fn format_cache_duration(duration: Duration) -> String {
    let seconds = duration.as_secs_f64();
    if seconds < 60.0 {
        return format!("{seconds} seconds");
    }
    format!("{} minutes", seconds / 60.0)
}
