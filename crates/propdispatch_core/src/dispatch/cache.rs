//! Bounded least-recently-used cache of resolved bindings.
//!
//! # Invariants
//! - Never holds more than `capacity` entries.
//! - Entries leave only through LRU eviction, `remove`, or `clear`.

use crate::dispatch::binding::{PropertyBinding, PropertyKey};
use lru::LruCache;
use std::num::NonZeroUsize;

/// Capacity used when none is configured.
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Cache performance counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub evictions: usize,
    /// Hits rejected because a forcing caller found a provisional entry.
    pub stale: usize,
}

/// LRU map from `PropertyKey` to `PropertyBinding`.
pub struct ResultCache {
    entries: LruCache<PropertyKey, PropertyBinding>,
    stats: CacheStats,
}

impl ResultCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: LruCache::new(capacity),
            stats: CacheStats::default(),
        }
    }

    /// Returns the binding for `key` and marks it most recently used.
    pub fn get(&mut self, key: &PropertyKey) -> Option<PropertyBinding> {
        match self.entries.get(key) {
            Some(binding) => {
                self.stats.hits += 1;
                Some(binding.clone())
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Returns `true` when `key` is cached, without touching recency or stats.
    pub fn contains(&self, key: &PropertyKey) -> bool {
        self.entries.contains(key)
    }

    /// Inserts or overwrites; returns the key evicted to make room, if any.
    pub fn put(&mut self, key: PropertyKey, binding: PropertyBinding) -> Option<PropertyKey> {
        match self.entries.push(key.clone(), binding) {
            Some((evicted, _)) if evicted != key => {
                self.stats.evictions += 1;
                Some(evicted)
            }
            _ => None,
        }
    }

    pub fn remove(&mut self, key: &PropertyKey) -> Option<PropertyBinding> {
        self.entries.pop(key)
    }

    /// Drops a provisional entry that a forcing caller cannot reuse.
    pub(crate) fn invalidate_stale(&mut self, key: &PropertyKey) {
        if self.entries.pop(key).is_some() {
            self.stats.stale += 1;
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
