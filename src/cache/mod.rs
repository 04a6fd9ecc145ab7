//! Kernel cache implementation
//!
//! Provides an LRU cache of kernel matrix columns to avoid redundant
//! computations in the SMO algorithm. Column `i` holds `Q(i, j)` for every
//! training row `j`; symmetric access is left to the caller.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// LRU cache for kernel matrix columns
pub struct KernelCache {
    cache: LruCache<usize, Arc<[f64]>>,
    hits: u64,
    misses: u64,
}

impl KernelCache {
    /// Create a new kernel cache with specified capacity in number of columns
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Create a kernel cache with capacity based on memory size in bytes
    ///
    /// Each column costs `column_len` f64 values, and there are never more
    /// than `column_len` distinct columns. At least two columns are kept so
    /// a working pair never evicts itself.
    pub fn with_memory_limit(memory_bytes: usize, column_len: usize) -> Self {
        let column_bytes = column_len.max(1) * std::mem::size_of::<f64>();
        let capacity = (memory_bytes / column_bytes).clamp(2, column_len.max(2));
        Self::new(capacity)
    }

    /// Get a column from cache
    pub fn get(&mut self, i: usize) -> Option<Arc<[f64]>> {
        if let Some(column) = self.cache.get(&i) {
            self.hits += 1;
            Some(Arc::clone(column))
        } else {
            self.misses += 1;
            None
        }
    }

    /// Get a column, computing and caching it on a miss
    pub fn get_or_insert_with<F>(&mut self, i: usize, compute: F) -> Arc<[f64]>
    where
        F: FnOnce() -> Vec<f64>,
    {
        if let Some(column) = self.get(i) {
            return column;
        }
        let column: Arc<[f64]> = compute().into();
        self.cache.put(i, Arc::clone(&column));
        column
    }

    /// Put a column into cache
    pub fn put(&mut self, i: usize, column: Arc<[f64]>) {
        self.cache.put(i, column);
    }

    /// Get cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            capacity: self.cache.cap().get(),
            size: self.cache.len(),
        }
    }

    /// Clear the cache
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
