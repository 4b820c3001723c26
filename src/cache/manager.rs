//! Cache manager.

use super::backend::{CacheBackend, CacheEntry, MemoryCache, NullCache};
use super::key::CacheKey;
use crate::transport::RawResponse;
use crate::Result;
use once_cell::sync::Lazy;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct AtomicStats {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
}

impl AtomicStats {
    fn new() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            inserts: AtomicU64::new(0),
        }
    }

    fn to_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
        }
    }
}

/// Time-bounded cache in front of slow-changing server metadata.
pub struct MetadataCache {
    backend: Box<dyn CacheBackend>,
    stats: AtomicStats,
}

static GLOBAL_CACHE: Lazy<Arc<MetadataCache>> =
    Lazy::new(|| Arc::new(MetadataCache::in_memory(1024)));

impl MetadataCache {
    pub fn new(backend: Box<dyn CacheBackend>) -> Self {
        Self {
            backend,
            stats: AtomicStats::new(),
        }
    }

    pub fn in_memory(max_entries: usize) -> Self {
        Self::new(Box::new(MemoryCache::new(max_entries)))
    }

    pub fn disabled() -> Self {
        Self::new(Box::new(NullCache::new()))
    }

    /// The process-wide cache shared by every client that was not given its own.
    pub fn global() -> Arc<MetadataCache> {
        GLOBAL_CACHE.clone()
    }

    /// Return a fresh cached answer for `key`, or run `fetch` and remember its success.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        fetch: F,
    ) -> Result<RawResponse>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<RawResponse>>,
    {
        if let Some(entry) = self.backend.get(key) {
            if entry.fetched_at.elapsed() < ttl {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "metadata cache hit");
                return Ok(entry.payload);
            }
        }
        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        debug!(key = %key, "metadata cache miss");
        self.fetch_and_store(key, fetch).await
    }

    /// Skip the lookup, fetch, and replace the entry on success.
    pub async fn fetch_and_store<F, Fut>(&self, key: &CacheKey, fetch: F) -> Result<RawResponse>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<RawResponse>>,
    {
        let payload = fetch().await?;
        self.backend
            .insert(key.clone(), CacheEntry::new(payload.clone()));
        self.stats.inserts.fetch_add(1, Ordering::Relaxed);
        Ok(payload)
    }

    pub fn invalidate(&self, key: &CacheKey) -> bool {
        self.backend.remove(key)
    }

    /// Drop every entry cached for one server, e.g. after its model set changed.
    pub fn invalidate_server(&self, base_url: &str) -> usize {
        self.backend.remove_where(&|k: &CacheKey| k.base_url == base_url)
    }

    pub fn clear(&self) {
        self.backend.clear();
    }

    pub fn len(&self) -> usize {
        self.backend.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backend.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.to_stats()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }
}
