//! Shared tile byte cache.
//!
//! [`TileCache`] keeps recently fetched tile bytes keyed by address. It is the
//! only state shared between pipeline invocations, and it is `Send + Sync` so
//! that request handlers on different threads can share one instance.
//! [`CachedSource`] puts a cache in front of any [`TileSource`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use moka::sync::Cache;
use tracing::debug;

use crate::error::DemError;
use crate::promise::Promise;
use crate::source::{TileBytes, TileSource};

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of tiles currently in the cache.
    pub entry_count: u64,
    /// Number of cache hits (requests served from cache).
    pub hit_count: u64,
    /// Number of cache misses (tiles requested from the source).
    pub miss_count: u64,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 to 1.0).
    ///
    /// Returns 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            self.hit_count as f64 / total as f64
        }
    }
}

/// Bounded, thread-safe cache of tile bytes.
///
/// Clones share the same storage and counters.
#[derive(Clone)]
pub struct TileCache {
    tiles: Cache<String, TileBytes>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl TileCache {
    /// Create a cache holding at most `capacity` tiles.
    pub fn new(capacity: u64) -> Self {
        Self {
            tiles: Cache::builder().max_capacity(capacity).build(),
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Look up a tile, counting the hit or miss.
    pub fn get(&self, address: &str) -> Option<TileBytes> {
        let found = self.tiles.get(address);
        let counter = if found.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    pub fn insert(&self, address: impl Into<String>, bytes: TileBytes) {
        self.tiles.insert(address.into(), bytes);
    }

    pub fn clear(&self) {
        self.tiles.invalidate_all();
    }

    /// Maximum number of tiles kept.
    pub fn capacity(&self) -> u64 {
        self.tiles.policy().max_capacity().unwrap_or(0)
    }

    pub fn stats(&self) -> CacheStats {
        self.tiles.run_pending_tasks();
        CacheStats {
            entry_count: self.tiles.entry_count(),
            hit_count: self.hits.load(Ordering::Relaxed),
            miss_count: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for TileCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileCache")
            .field("capacity", &self.capacity())
            .field("hits", &self.hits.load(Ordering::Relaxed))
            .field("misses", &self.misses.load(Ordering::Relaxed))
            .finish()
    }
}

/// A [`TileSource`] that consults a [`TileCache`] before its inner source.
///
/// Successful fetches are inserted into the cache when they settle; failures
/// are not cached.
pub struct CachedSource<S> {
    inner: S,
    cache: TileCache,
}

impl<S: TileSource> CachedSource<S> {
    pub fn new(inner: S, cache: TileCache) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &TileCache {
        &self.cache
    }
}

impl<S: TileSource> TileSource for CachedSource<S> {
    fn fetch(&self, address: &str) -> Promise<TileBytes, DemError> {
        if let Some(bytes) = self.cache.get(address) {
            debug!(address, "Tile cache hit");
            return Promise::resolved(bytes);
        }

        let cache = self.cache.clone();
        let key = address.to_string();
        let fetched = self.inner.fetch(address);
        fetched.on_settled(move |outcome| {
            if let Some(bytes) = outcome.ok() {
                cache.insert(key, bytes);
            }
        });
        fetched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::promise::Deferred;
    use crate::source::MemorySource;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_cache_stats() {
        let stats = CacheStats {
            entry_count: 5,
            hit_count: 80,
            miss_count: 20,
        };
        assert_eq!(stats.hit_rate(), 0.8);

        let empty_stats = CacheStats::default();
        assert_eq!(empty_stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_cached_source_counts_hits() {
        let cache = TileCache::new(10);
        let source = CachedSource::new(
            MemorySource::new().with_tile("a.hgt", vec![1u8, 2]),
            cache.clone(),
        );

        assert!(source.fetch("a.hgt").settlement().unwrap().is_fulfilled());
        assert!(source.fetch("a.hgt").settlement().unwrap().is_fulfilled());
        assert!(source.fetch("b.hgt").settlement().unwrap().is_rejected());

        let stats = cache.stats();
        assert_eq!(stats.entry_count, 1);
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 2);
    }

    #[test]
    fn test_inner_source_called_once() {
        let calls = Rc::new(Cell::new(0));
        let counted = Rc::clone(&calls);
        let inner = move |_: &str| {
            counted.set(counted.get() + 1);
            Promise::resolved(TileBytes::from(vec![0u8; 2]))
        };

        let source = CachedSource::new(inner, TileCache::new(10));
        source.fetch("x");
        source.fetch("x");
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_pending_fetch_is_cached_when_it_settles() {
        let deferred = Deferred::<TileBytes, DemError>::new();
        let pending = deferred.promise();
        let source = CachedSource::new(move |_: &str| pending.clone(), TileCache::new(10));

        source.fetch("late.hgt");
        assert!(source.cache().get("late.hgt").is_none());

        deferred.resolve(TileBytes::from(vec![4u8, 2]));
        let cached = source.cache().get("late.hgt").unwrap();
        assert_eq!(&cached[..], &[4, 2]);
    }

    #[test]
    fn test_clear_and_capacity() {
        let cache = TileCache::new(3);
        cache.insert("a", TileBytes::from(vec![0u8]));
        assert_eq!(cache.capacity(), 3);
        cache.clear();
        assert!(cache.get("a").is_none());
    }
}
