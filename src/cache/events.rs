//! Cache event reporting: structured log lines and counters.

use metrics::counter;
use tracing::debug;

pub const METRIC_CACHE_HIT_TOTAL: &str = "sijil_cache_hit_total";
pub const METRIC_CACHE_MISS_TOTAL: &str = "sijil_cache_miss_total";
pub const METRIC_CACHE_INVALIDATE_TOTAL: &str = "sijil_cache_invalidate_total";
pub const METRIC_CACHE_EXPIRED_TOTAL: &str = "sijil_cache_expired_total";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEvent {
    Hit,
    Miss,
    Store,
    Invalidate,
    Clear,
    Cleanup,
}

impl CacheEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheEvent::Hit => "hit",
            CacheEvent::Miss => "miss",
            CacheEvent::Store => "store",
            CacheEvent::Invalidate => "invalidate",
            CacheEvent::Clear => "clear",
            CacheEvent::Cleanup => "cleanup",
        }
    }

    fn metric(self) -> Option<&'static str> {
        match self {
            CacheEvent::Hit => Some(METRIC_CACHE_HIT_TOTAL),
            CacheEvent::Miss => Some(METRIC_CACHE_MISS_TOTAL),
            CacheEvent::Invalidate | CacheEvent::Clear => Some(METRIC_CACHE_INVALIDATE_TOTAL),
            CacheEvent::Cleanup => Some(METRIC_CACHE_EXPIRED_TOTAL),
            CacheEvent::Store => None,
        }
    }
}

/// Count the event and, when verbose logging is on, log it against `subject`.
pub(crate) fn record(verbose: bool, event: CacheEvent, subject: &str) {
    if let Some(name) = event.metric() {
        counter!(name).increment(1);
    }
    if verbose {
        debug!(
            target: "sijil::cache",
            event = event.as_str(),
            subject,
            "cache event"
        );
    }
}
