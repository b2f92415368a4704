//! Kernel cache implementation
//!
//! LRU cache of kernel values between training samples. Kernel matrices
//! are symmetric, so entries are keyed by the ordered pair (min, max).

use lru::LruCache;
use std::num::NonZeroUsize;

/// Bytes charged per cached entry (key, value and bookkeeping)
const BYTES_PER_ENTRY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PairKey(usize, usize);

impl PairKey {
    fn new(i: usize, j: usize) -> Self {
        if i <= j {
            Self(i, j)
        } else {
            Self(j, i)
        }
    }
}

/// LRU cache for kernel matrix values
pub struct KernelCache {
    cache: LruCache<PairKey, f64>,
    hits: u64,
    misses: u64,
}

impl KernelCache {
    /// Create a cache holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Create a cache for `n` training samples within a memory budget
    ///
    /// Never allocates more entries than the upper triangle of the
    /// kernel matrix needs.
    pub fn for_samples(n: usize, memory_bytes: usize) -> Self {
        let needed = n.saturating_mul(n + 1) / 2;
        Self::new(needed.min(memory_bytes / BYTES_PER_ENTRY))
    }

    pub fn get(&mut self, i: usize, j: usize) -> Option<f64> {
        match self.cache.get(&PairKey::new(i, j)) {
            Some(&value) => {
                self.hits += 1;
                Some(value)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn put(&mut self, i: usize, j: usize, value: f64) {
        self.cache.put(PairKey::new(i, j), value);
    }

    /// Return the cached K(i, j) or compute and store it
    pub fn get_or_compute<F>(&mut self, i: usize, j: usize, compute: F) -> f64
    where
        F: FnOnce() -> f64,
    {
        if let Some(value) = self.get(i, j) {
            return value;
        }
        let value = compute();
        self.put(i, j, value);
        value
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            capacity: self.cache.cap().get(),
            size: self.cache.len(),
        }
    }

    pub fn clear(&mut self) {
        self.cache.clear();
        self.hits = 0;
        self.misses = 0;
    }
}

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub capacity: usize,
    pub size: usize,
}
