use crate::posting::Posting;
use lru::LruCache;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Postings of frequently queried tokens, kept in memory.
///
/// A token is admitted once it has been queried `promote_after` times. The
/// cache is bounded; the least recently used token is evicted first and is
/// re-admitted on its next disk read.
pub struct HotTermCache {
    promote_after: u32,
    frequencies: Mutex<HashMap<String, u32>>,
    entries: Mutex<LruCache<String, Arc<Vec<Posting>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub len: usize,
}

impl HotTermCache {
    pub fn new(promote_after: u32, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            promote_after,
            frequencies: Mutex::new(HashMap::new()),
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Count one query containing `token`; returns the new count.
    pub fn record_query(&self, token: &str) -> u32 {
        let mut freqs = self.frequencies.lock();
        let count = freqs.entry(token.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn frequency(&self, token: &str) -> u32 {
        self.frequencies.lock().get(token).copied().unwrap_or(0)
    }

    pub fn get(&self, token: &str) -> Option<Arc<Vec<Posting>>> {
        let found = self.entries.lock().get(token).cloned();
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    /// Admit `postings` if `token` is hot enough. Returns whether it was cached.
    pub fn offer(&self, token: &str, postings: &Arc<Vec<Posting>>) -> bool {
        if self.frequency(token) < self.promote_after {
            return false;
        }
        self.entries.lock().put(token.to_string(), Arc::clone(postings));
        true
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            len: self.entries.lock().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::posting::Fields;

    fn postings() -> Arc<Vec<Posting>> {
        Arc::new(vec![Posting::new(0, 1, Fields::empty(), vec![1])])
    }

    #[test]
    fn admits_only_after_threshold() {
        let cache = HotTermCache::new(3, 8);
        let p = postings();
        cache.record_query("cat");
        cache.record_query("cat");
        assert!(!cache.offer("cat", &p));
        assert!(cache.get("cat").is_none());
        assert_eq!(cache.record_query("cat"), 3);
        assert!(cache.offer("cat", &p));
        assert_eq!(cache.get("cat").unwrap(), p);
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1, len: 1 });
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = HotTermCache::new(1, 2);
        let p = postings();
        for token in ["a", "b", "c"] {
            cache.record_query(token);
            cache.offer(token, &p);
        }
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
        assert_eq!(cache.frequency("a"), 1);
    }
}
