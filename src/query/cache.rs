use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use parking_lot::Mutex;
use crate::query::finder::{self, FinderSpec};

/// Memo of dynamic finder name resolutions
pub struct FinderCache {
    cache: Mutex<LruCache<String, Option<FinderSpec>>>,
    size_limit: usize,
    hit_count: AtomicUsize,
    miss_count: AtomicUsize,
}

impl FinderCache {
    pub fn new(size_limit: usize) -> Self {
        let cap = NonZeroUsize::new(size_limit).unwrap_or(NonZeroUsize::MIN);
        FinderCache {
            cache: Mutex::new(LruCache::new(cap)),
            size_limit: cap.get(),
            hit_count: AtomicUsize::new(0),
            miss_count: AtomicUsize::new(0),
        }
    }

    /// Resolve `method_name`, parsing it only on a cache miss.
    pub fn resolve(&self, method_name: &str) -> Option<FinderSpec> {
        let mut cache = self.cache.lock();
        if let Some(spec) = cache.get(method_name) {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
            return spec.clone();
        }

        self.miss_count.fetch_add(1, Ordering::Relaxed);
        let spec = finder::resolve(method_name);
        tracing::trace!(method = method_name, resolved = spec.is_some(), "resolved finder name");
        cache.put(method_name.to_string(), spec.clone());
        spec
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
            size: self.cache.lock().len(),
            capacity: self.size_limit,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheStats {
    pub hit_count: usize,
    pub miss_count: usize,
    pub size: usize,
    pub capacity: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            self.hit_count as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_lookups_hit_the_cache() {
        let cache = FinderCache::new(4);
        assert!(cache.resolve("find_by_name").is_some());
        assert!(cache.resolve("find_by_name").is_some());
        assert!(cache.resolve("nope").is_none());
        assert!(cache.resolve("nope").is_none());

        let stats = cache.stats();
        assert_eq!(stats.hit_count, 2);
        assert_eq!(stats.miss_count, 2);
        assert_eq!(stats.size, 2);
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = FinderCache::new(1);
        cache.resolve("find_by_a");
        cache.resolve("find_by_b");
        assert_eq!(cache.stats().size, 1);

        cache.resolve("find_by_a");
        assert_eq!(cache.stats().hit_count, 0);
    }
}
