//! Render cache for query text
//!
//! Benchmark workloads issue the same few query shapes millions of times.
//! The renderer memoises each shape here, keyed by the template and every
//! input substituted into it, so only the parameter values change between
//! calls.
//!
//! # Example
//!
//! ```
//! use ycsb_ydb::cache::{RenderCache, RenderCacheConfig};
//!
//! let cache = RenderCache::new(RenderCacheConfig::new(16));
//!
//! let first = cache.get_or_render("read|/local|usertable", || "SELECT 1;".to_string());
//! let second = cache.get_or_render("read|/local|usertable", || unreachable!());
//! assert_eq!(first, second);
//!
//! let stats = cache.stats();
//! assert_eq!(stats.hits, 1);
//! assert_eq!(stats.misses, 1);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Default number of cached query shapes
pub const DEFAULT_MAX_ENTRIES: usize = 128;

/// Default budget for keys plus query text (64 KB)
pub const DEFAULT_MAX_BYTES: usize = 64 * 1024;

/// Render cache limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderCacheConfig {
    max_entries: usize,
    max_bytes: Option<usize>,
    enabled: bool,
}

impl Default for RenderCacheConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl RenderCacheConfig {
    /// Cache up to `max_entries` shapes within the default byte budget
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries: max_entries.max(1),
            max_bytes: Some(DEFAULT_MAX_BYTES),
            enabled: true,
        }
    }

    /// Never cache; every lookup renders
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Replace the byte budget; `None` removes it
    pub fn with_max_bytes(mut self, max_bytes: Option<usize>) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Maximum number of cached shapes
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Byte budget, if any
    pub fn max_bytes(&self) -> Option<usize> {
        self.max_bytes
    }

    /// Whether lookups may hit
    pub fn enabled(&self) -> bool {
        self.enabled
    }
}

/// Counters at a point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    /// Lookups served from the cache
    pub hits: u64,
    /// Lookups that had to render
    pub misses: u64,
    /// Shapes pushed out by a limit
    pub evictions: u64,
    /// Shapes stored
    pub insertions: u64,
}

impl CacheStatsSnapshot {
    /// Fraction of lookups that hit, 0.0 when there were none
    pub fn hit_rate(&self) -> f64 {
        match self.hits + self.misses {
            0 => 0.0,
            total => self.hits as f64 / total as f64,
        }
    }
}

struct Slot {
    query: Arc<str>,
    used: u64,
    bytes: usize,
}

#[derive(Default)]
struct Inner {
    slots: HashMap<String, Slot>,
    clock: u64,
    bytes: usize,
    stats: CacheStatsSnapshot,
}

impl Inner {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn evict_oldest(&mut self) -> bool {
        let oldest = self
            .slots
            .iter()
            .min_by_key(|(_, slot)| slot.used)
            .map(|(key, _)| key.clone());
        match oldest.and_then(|key| self.slots.remove(&key)) {
            Some(slot) => {
                self.bytes -= slot.bytes;
                self.stats.evictions += 1;
                true
            }
            None => false,
        }
    }
}

/// LRU cache of rendered query text
///
/// One mutex guards the map and its counters; hold times are a hash lookup.
pub struct RenderCache {
    config: RenderCacheConfig,
    inner: Mutex<Inner>,
}

impl RenderCache {
    /// Create a cache with the given limits
    pub fn new(config: RenderCacheConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// The cache limits
    pub fn config(&self) -> &RenderCacheConfig {
        &self.config
    }

    /// Return the cached text for `key`, rendering and storing it on a miss
    ///
    /// `render` runs outside the lock. When two threads miss on the same key
    /// both render, and the first stored text wins.
    pub fn get_or_render<F>(&self, key: &str, render: F) -> Arc<str>
    where
        F: FnOnce() -> String,
    {
        if let Some(query) = self.get(key) {
            return query;
        }
        let query: Arc<str> = Arc::from(render());
        if self.config.enabled {
            return self.store(key, query);
        }
        query
    }

    /// Look up cached text and mark it recently used
    pub fn get(&self, key: &str) -> Option<Arc<str>> {
        let Ok(mut inner) = self.inner.lock() else {
            return None;
        };
        if !self.config.enabled {
            inner.stats.misses += 1;
            return None;
        }
        let now = inner.tick();
        let found = inner.slots.get_mut(key).map(|slot| {
            slot.used = now;
            Arc::clone(&slot.query)
        });
        match found {
            Some(_) => inner.stats.hits += 1,
            None => inner.stats.misses += 1,
        }
        found
    }

    fn store(&self, key: &str, query: Arc<str>) -> Arc<str> {
        let Ok(mut inner) = self.inner.lock() else {
            return query;
        };
        let now = inner.tick();
        if let Some(slot) = inner.slots.get_mut(key) {
            slot.used = now;
            return Arc::clone(&slot.query);
        }

        let bytes = key.len() + query.len();
        if self.config.max_bytes.is_some_and(|max| bytes > max) {
            return query;
        }

        while inner.slots.len() >= self.config.max_entries && inner.evict_oldest() {}
        if let Some(max) = self.config.max_bytes {
            while inner.bytes + bytes > max && inner.evict_oldest() {}
        }

        inner.bytes += bytes;
        inner.stats.insertions += 1;
        inner.slots.insert(
            key.to_string(),
            Slot {
                query: Arc::clone(&query),
                used: now,
                bytes,
            },
        );
        query
    }

    /// Whether `key` is cached
    pub fn contains(&self, key: &str) -> bool {
        self.inner
            .lock()
            .map(|inner| inner.slots.contains_key(key))
            .unwrap_or(false)
    }

    /// Number of cached shapes
    pub fn len(&self) -> usize {
        self.inner.lock().map(|inner| inner.slots.len()).unwrap_or(0)
    }

    /// Whether nothing is cached
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes of keys plus text currently held
    pub fn size_bytes(&self) -> usize {
        self.inner.lock().map(|inner| inner.bytes).unwrap_or(0)
    }

    /// Drop every cached shape; counters are kept
    pub fn clear(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.slots.clear();
            inner.bytes = 0;
        }
    }

    /// Current counters
    pub fn stats(&self) -> CacheStatsSnapshot {
        self.inner
            .lock()
            .map(|inner| inner.stats)
            .unwrap_or_default()
    }
}

impl Default for RenderCache {
    fn default() -> Self {
        Self::new(RenderCacheConfig::default())
    }
}

impl std::fmt::Debug for RenderCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderCache")
            .field("config", &self.config)
            .field("len", &self.len())
            .field("stats", &self.stats())
            .finish()
    }
}
