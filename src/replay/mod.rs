//! Replay of captured responses

mod cache;

pub use cache::ResponseCache;

/// Cache statistics
#[derive(Debug, Clone, Copy)]
pub struct CacheStats {
    /// Cache hits
    pub hits: usize,
    /// Cache misses
    pub misses: usize,
    /// Hit rate (0.0 to 1.0)
    pub hit_rate: f64,
    /// Cache size (number of records)
    pub size: usize,
}

impl ResponseCache {
    /// Snapshot of the hit/miss counters and size
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hit_count(),
            misses: self.miss_count(),
            hit_rate: self.hit_rate(),
            size: self.size(),
        }
    }
}
