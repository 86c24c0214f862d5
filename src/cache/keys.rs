//! Cache key definitions.

use std::fmt;

/// Identifies one cached sitemap document.
///
/// `version` is the catalog's change counter; it is the only invalidation
/// signal, so a bump makes every previous key unreachable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SitemapCacheKey {
    pub base_url: String,
    pub filename: String,
    pub version: u64,
    pub index: Option<u64>,
}

impl fmt::Display for SitemapCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let index = match self.index {
            Some(index) => index.to_string(),
            None => "None".to_string(),
        };
        write!(
            f,
            "{}/{}/{}/{}",
            self.base_url, self.filename, self.version, index
        )
    }
}

/// Outcome of the cache-key policy for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheDecision {
    /// Authenticated callers neither read nor write the cache.
    Uncacheable,
    Cacheable(SitemapCacheKey),
}

impl CacheDecision {
    pub fn key(&self) -> Option<&SitemapCacheKey> {
        match self {
            CacheDecision::Uncacheable => None,
            CacheDecision::Cacheable(key) => Some(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(version: u64, index: Option<u64>) -> SitemapCacheKey {
        SitemapCacheKey {
            base_url: "http://nohost/plone".to_string(),
            filename: "sitemap.xml".to_string(),
            version,
            index,
        }
    }

    #[test]
    fn display_joins_components() {
        assert_eq!(
            key(7, None).to_string(),
            "http://nohost/plone/sitemap.xml/7/None"
        );
        assert_eq!(
            key(7, Some(2)).to_string(),
            "http://nohost/plone/sitemap.xml/7/2"
        );
    }

    #[test]
    fn version_and_index_distinguish_keys() {
        assert_ne!(key(1, None), key(2, None));
        assert_ne!(key(1, None), key(1, Some(0)));
        assert_eq!(key(3, Some(1)), key(3, Some(1)));
    }

    #[test]
    fn uncacheable_has_no_key() {
        assert!(CacheDecision::Uncacheable.key().is_none());
        assert_eq!(
            CacheDecision::Cacheable(key(1, None)).key(),
            Some(&key(1, None))
        );
    }
}
