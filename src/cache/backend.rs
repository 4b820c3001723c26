//! Cache backend implementations.

use super::key::CacheKey;
use crate::transport::RawResponse;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tokio::time::Instant;

/// An immutable cached answer.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub payload: RawResponse,
    pub fetched_at: Instant,
}

impl CacheEntry {
    pub fn new(payload: RawResponse) -> Self {
        Self {
            payload,
            fetched_at: Instant::now(),
        }
    }
}

/// Entry storage. Each call is atomic for its key.
pub trait CacheBackend: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<CacheEntry>;
    fn insert(&self, key: CacheKey, entry: CacheEntry);
    fn remove(&self, key: &CacheKey) -> bool;
    /// Remove every key matching `pred`; returns how many were dropped.
    fn remove_where(&self, pred: &dyn Fn(&CacheKey) -> bool) -> usize;
    fn clear(&self);
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn name(&self) -> &'static str;
}

pub struct MemoryCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    max_entries: usize,
}

impl MemoryCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    fn evict_if_needed(&self, entries: &mut HashMap<CacheKey, CacheEntry>, incoming: &CacheKey) {
        while entries.len() >= self.max_entries && !entries.contains_key(incoming) {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.fetched_at)
                .map(|(k, _)| k.clone());
            match oldest {
                Some(k) => {
                    entries.remove(&k);
                }
                None => break,
            }
        }
    }
}

impl CacheBackend for MemoryCache {
    fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn insert(&self, key: CacheKey, entry: CacheEntry) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        self.evict_if_needed(&mut entries, &key);
        entries.insert(key, entry);
    }

    fn remove(&self, key: &CacheKey) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .is_some()
    }

    fn remove_where(&self, pred: &dyn Fn(&CacheKey) -> bool) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|k, _| !pred(k));
        before - entries.len()
    }

    fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Stores nothing; every lookup is a miss.
pub struct NullCache;

impl NullCache {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NullCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheBackend for NullCache {
    fn get(&self, _: &CacheKey) -> Option<CacheEntry> {
        None
    }
    fn insert(&self, _: CacheKey, _: CacheEntry) {}
    fn remove(&self, _: &CacheKey) -> bool {
        false
    }
    fn remove_where(&self, _: &dyn Fn(&CacheKey) -> bool) -> usize {
        0
    }
    fn clear(&self) {}
    fn len(&self) -> usize {
        0
    }
    fn name(&self) -> &'static str {
        "null"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(endpoint: &str) -> CacheKey {
        CacheKey::new(endpoint, "http://h:1")
    }

    #[tokio::test(start_paused = true)]
    async fn evicts_oldest_when_full() {
        let cache = MemoryCache::new(2);
        cache.insert(key("/a"), CacheEntry::new(RawResponse::new(200, json!(1))));
        tokio::time::advance(std::time::Duration::from_millis(5)).await;
        cache.insert(key("/b"), CacheEntry::new(RawResponse::new(200, json!(2))));
        tokio::time::advance(std::time::Duration::from_millis(5)).await;
        cache.insert(key("/c"), CacheEntry::new(RawResponse::new(200, json!(3))));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&key("/a")).is_none());
        assert!(cache.get(&key("/c")).is_some());
    }

    #[test]
    fn replacing_a_key_does_not_evict_others() {
        let cache = MemoryCache::new(2);
        cache.insert(key("/a"), CacheEntry::new(RawResponse::new(200, json!(1))));
        cache.insert(key("/b"), CacheEntry::new(RawResponse::new(200, json!(2))));
        cache.insert(key("/b"), CacheEntry::new(RawResponse::new(200, json!(3))));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&key("/b")).unwrap().payload.body, json!(3));
    }

    #[test]
    fn null_cache_never_hits() {
        let cache = NullCache::new();
        cache.insert(key("/a"), CacheEntry::new(RawResponse::new(200, json!(1))));
        assert!(cache.get(&key("/a")).is_none());
        assert!(cache.is_empty());
    }
}
