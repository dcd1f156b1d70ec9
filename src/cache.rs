//! Bounded in-memory cache of image dimensions keyed by URL.
//!
//! Entries live for the life of the process and are never invalidated:
//! image URLs are assumed to be content-stable. When the cache is full the
//! least-recently-used entry is evicted.
//!
//! The map is an [`IndexMap`] kept in recency order (front = oldest) behind
//! a `parking_lot::Mutex`; every operation holds the lock only for the map
//! update itself, never across I/O.

use crate::output::ImageDimensions;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Process-wide URL → dimensions cache with LRU eviction.
///
/// Construct one per process (or per test) and share it via `Arc`.
#[derive(Debug)]
pub struct DimensionCache {
    entries: Mutex<IndexMap<String, ImageDimensions>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl DimensionCache {
    /// Create a cache holding at most `capacity` URLs (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(IndexMap::with_capacity(capacity)),
            capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Look up a URL, marking it most recently used on a hit.
    pub fn get(&self, url: &str) -> Option<ImageDimensions> {
        let mut entries = self.entries.lock();
        match entries.shift_remove(url) {
            Some(dims) => {
                entries.insert(url.to_string(), dims);
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(dims)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store dimensions for a URL, evicting the least recently used entry if full.
    pub fn insert(&self, url: &str, dims: ImageDimensions) {
        let mut entries = self.entries.lock();
        if entries.shift_remove(url).is_none() && entries.len() >= self.capacity {
            if let Some((evicted, _)) = entries.shift_remove_index(0) {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                debug!("dimension cache: evicted {}", evicted);
            }
        }
        entries.insert(url.to_string(), dims);
    }

    /// Whether a URL is cached, without touching recency or counters.
    pub fn contains(&self, url: &str) -> bool {
        self.entries.lock().contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            capacity: self.capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

impl Default for DimensionCache {
    fn default() -> Self {
        Self::new(128)
    }
}
