//! Response cache storage.
//!
//! Maps a cache key to the shared handle of a response that is in flight or
//! already settled. An entry is live while younger than the TTL.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use super::config::CacheConfig;
use super::events::{self, CacheEvent};
use super::keys::ParsedCacheKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// A stored response handle and the instant it was requested.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub data: V,
    pub stored_at: Instant,
    generation: u64,
}

/// Diagnostic snapshot of the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub size: usize,
    pub entries: Vec<String>,
    pub valid_count: usize,
    pub expired_count: usize,
}

/// Outcome of [`ResponseCache::get_or_insert_with`], with the generation of
/// the entry that was returned.
#[derive(Debug, Clone)]
pub enum Lookup<V> {
    Hit(V, u64),
    Miss(V, u64),
}

impl<V> Lookup<V> {
    pub fn into_inner(self) -> V {
        match self {
            Lookup::Hit(value, _) | Lookup::Miss(value, _) => value,
        }
    }

    pub fn generation(&self) -> u64 {
        match self {
            Lookup::Hit(_, generation) | Lookup::Miss(_, generation) => *generation,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, Lookup::Hit(..))
    }
}

/// TTL-bounded map of cache key to shared response handle.
pub struct ResponseCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    ttl: Duration,
    verbose: bool,
    next_generation: AtomicU64,
}

impl<V: Clone> ResponseCache<V> {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: config.ttl(),
            verbose: config.verbose_logging,
            next_generation: AtomicU64::new(1),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_live(&self, entry: &CacheEntry<V>, now: Instant) -> bool {
        now.saturating_duration_since(entry.stored_at) < self.ttl
    }

    /// Return the live entry for `key`, if any.
    pub fn lookup(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        rw_read(&self.entries, SOURCE, "lookup")
            .get(key)
            .filter(|entry| self.is_live(entry, now))
            .map(|entry| entry.data.clone())
    }

    /// Return the live entry for `key`, or store the handle built by `make`.
    ///
    /// `make` receives the generation of the new entry, which
    /// [`evict_generation`](Self::evict_generation) needs to remove exactly that
    /// entry later. Expired entries are swept on every miss.
    pub fn get_or_insert_with(&self, key: &str, make: impl FnOnce(u64) -> V) -> Lookup<V> {
        let now = Instant::now();
        let mut entries = rw_write(&self.entries, SOURCE, "get_or_insert_with");

        if let Some(entry) = entries.get(key).filter(|entry| self.is_live(entry, now)) {
            return Lookup::Hit(entry.data.clone(), entry.generation);
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let data = make(generation);
        entries.insert(
            key.to_string(),
            CacheEntry {
                data: data.clone(),
                stored_at: now,
                generation,
            },
        );

        let swept = self.sweep(&mut entries, now);
        if swept > 0 {
            tracing::trace!(target: "sijil::cache", swept, "swept expired cache entries");
        }

        Lookup::Miss(data, generation)
    }

    /// Store `data` under `key`, replacing any previous entry. Returns the
    /// generation of the new entry.
    pub fn insert(&self, key: &str, data: V) -> u64 {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        rw_write(&self.entries, SOURCE, "insert").insert(
            key.to_string(),
            CacheEntry {
                data,
                stored_at: Instant::now(),
                generation,
            },
        );
        events::record(self.verbose, CacheEvent::Store, key);
        generation
    }

    /// Remove the entry for `key` only if it still carries `generation`.
    pub fn evict_generation(&self, key: &str, generation: u64) -> bool {
        let mut entries = rw_write(&self.entries, SOURCE, "evict_generation");
        if entries
            .get(key)
            .is_some_and(|entry| entry.generation == generation)
        {
            entries.remove(key);
            events::record(self.verbose, CacheEvent::Invalidate, key);
            return true;
        }
        false
    }

    /// Drop every entry whose key starts with the base path of `url`.
    ///
    /// The query string and a trailing slash are ignored. Returns the number
    /// of entries removed.
    pub fn invalidate_prefix(&self, url: &str) -> usize {
        let base = base_path(url);
        self.remove_where(CacheEvent::Invalidate, "invalidate_prefix", |key| {
            key.starts_with(base)
        })
    }

    /// Like [`invalidate_prefix`](Self::invalidate_prefix), reported as a clear.
    pub fn clear_for_url(&self, url: &str) -> usize {
        let base = base_path(url);
        self.remove_where(CacheEvent::Clear, "clear_for_url", |key| {
            key.starts_with(base)
        })
    }

    /// Drop every entry whose URL contains `resource_type` or whose resource
    /// descriptor names it.
    pub fn invalidate_resource(&self, resource_type: &str) -> usize {
        self.remove_where(CacheEvent::Invalidate, "invalidate_resource", |key| {
            ParsedCacheKey::parse(key).matches_resource(resource_type)
        })
    }

    pub fn clear(&self) {
        let mut entries = rw_write(&self.entries, SOURCE, "clear");
        events::record(self.verbose, CacheEvent::Clear, "*");
        entries.clear();
    }

    /// Drop every expired entry. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = rw_write(&self.entries, SOURCE, "purge_expired");
        self.sweep(&mut entries, now)
    }

    fn sweep(&self, entries: &mut HashMap<String, CacheEntry<V>>, now: Instant) -> usize {
        let before = entries.len();
        entries.retain(|key, entry| {
            let live = self.is_live(entry, now);
            if !live {
                events::record(self.verbose, CacheEvent::Cleanup, key);
            }
            live
        });
        before - entries.len()
    }

    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let entries = rw_read(&self.entries, SOURCE, "stats");
        let valid_count = entries
            .values()
            .filter(|entry| self.is_live(entry, now))
            .count();
        let mut keys = entries.keys().cloned().collect::<Vec<_>>();
        keys.sort();
        CacheStats {
            size: entries.len(),
            entries: keys,
            valid_count,
            expired_count: entries.len() - valid_count,
        }
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove_where(
        &self,
        event: CacheEvent,
        op: &'static str,
        mut matches: impl FnMut(&str) -> bool,
    ) -> usize {
        let mut entries = rw_write(&self.entries, SOURCE, op);
        let before = entries.len();
        entries.retain(|key, _| {
            let remove = matches(key);
            if remove {
                events::record(self.verbose, event, key);
            }
            !remove
        });
        before - entries.len()
    }
}

fn base_path(url: &str) -> &str {
    let path = url.split('?').next().unwrap_or(url);
    path.strip_suffix('/').unwrap_or(path)
}
