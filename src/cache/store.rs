//! In-memory LRU store for compressed sitemap documents.

use std::sync::RwLock;

use bytes::Bytes;
use lru::LruCache;
use metrics::counter;
use tracing::debug;

use super::config::CacheConfig;
use super::keys::SitemapCacheKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

pub const METRIC_CACHE_HIT_TOTAL: &str = "sitemapper_cache_hit_total";
pub const METRIC_CACHE_MISS_TOTAL: &str = "sitemapper_cache_miss_total";
pub const METRIC_CACHE_EVICT_TOTAL: &str = "sitemapper_cache_evict_total";
pub const METRIC_CACHE_BYPASS_TOTAL: &str = "sitemapper_cache_bypass_total";

/// Compressed sitemap cache.
///
/// Concurrent misses on the same key each compute and store the document; the
/// last writer wins and the bytes are identical anyway.
pub struct SitemapCache {
    documents: RwLock<LruCache<SitemapCacheKey, Bytes>>,
}

impl SitemapCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            documents: RwLock::new(LruCache::new(config.capacity_non_zero())),
        }
    }

    pub fn get(&self, key: &SitemapCacheKey) -> Option<Bytes> {
        let cached = rw_write(&self.documents, SOURCE, "get").get(key).cloned();
        match cached {
            Some(body) => {
                counter!(METRIC_CACHE_HIT_TOTAL).increment(1);
                debug!(key = %key, outcome = "hit", "serving cached sitemap");
                Some(body)
            }
            None => {
                counter!(METRIC_CACHE_MISS_TOTAL).increment(1);
                debug!(key = %key, outcome = "miss", "sitemap not cached");
                None
            }
        }
    }

    /// Store a document, returning the key evicted to make room, if any.
    pub fn insert(&self, key: SitemapCacheKey, body: Bytes) -> Option<SitemapCacheKey> {
        let evicted = rw_write(&self.documents, SOURCE, "insert")
            .push(key.clone(), body)
            .map(|(evicted_key, _)| evicted_key)
            .filter(|evicted_key| *evicted_key != key);
        if let Some(evicted_key) = &evicted {
            counter!(METRIC_CACHE_EVICT_TOTAL).increment(1);
            debug!(key = %evicted_key, "evicted sitemap from cache");
        }
        evicted
    }

    pub fn contains(&self, key: &SitemapCacheKey) -> bool {
        rw_read(&self.documents, SOURCE, "contains").contains(key)
    }

    pub fn clear(&self) {
        rw_write(&self.documents, SOURCE, "clear").clear();
    }

    /// Get the number of cached documents.
    pub fn len(&self) -> usize {
        rw_read(&self.documents, SOURCE, "len").len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
