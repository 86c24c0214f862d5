//! Sitemap response cache.
//!
//! Compressed sitemap documents are cached per anonymous request signature:
//! site URL, document filename, catalog version and requested index. A new
//! catalog version produces new keys, so stale documents are never served and
//! simply age out of the LRU.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! capacity = 64
//! ```

mod config;
mod keys;
mod lock;
mod store;

pub use config::CacheConfig;
pub use keys::{CacheDecision, SitemapCacheKey};
pub use store::{
    METRIC_CACHE_BYPASS_TOTAL, METRIC_CACHE_EVICT_TOTAL, METRIC_CACHE_HIT_TOTAL,
    METRIC_CACHE_MISS_TOTAL, SitemapCache,
};
