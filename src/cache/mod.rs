//! Response cache for API reads.
//!
//! - **Keys**: [`CacheKeyBuilder`] assembles deterministic keys from a URL,
//!   parameters, headers and table state; [`patterns`] holds the common shapes.
//! - **Store**: [`ResponseCache`] keeps one shared handle per key for the
//!   configured TTL, so concurrent readers of the same key share one request.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! ttl_ms = 30000
//! disable_cache = false
//! verbose_logging = true
//! ```

mod config;
mod events;
mod keys;
mod lock;
pub mod patterns;
mod store;

pub use config::{CacheConfig, format_cache_duration};
pub use events::{
    CacheEvent, METRIC_CACHE_EXPIRED_TOTAL, METRIC_CACHE_HIT_TOTAL, METRIC_CACHE_INVALIDATE_TOTAL,
    METRIC_CACHE_MISS_TOTAL,
};
pub(crate) use events::record as record_event;
pub use keys::{CacheKeyBuilder, DEFAULT_CACHE_KEY, KEY_SEPARATOR, ParsedCacheKey, TimeGranularity};
pub(crate) use lock::mutex_lock;
pub use store::{CacheEntry, CacheStats, Lookup, ResponseCache};
