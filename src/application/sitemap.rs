//! Sitemap service: flat sitemap or sitemap index, gzip-compressed.
//!
//! This service encapsulates the pagination and caching policy for sitemap
//! documents, keeping the HTTP layer focused on request/response handling.

use std::{sync::Arc, time::Instant};

use bytes::Bytes;
use metrics::{counter, histogram};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::application::pagination::{Layout, PageConfig, PaginationError, parse_index};
use crate::application::render::{RenderError, SitemapRenderer};
use crate::application::repos::{CatalogQuery, ContentSource, SourceError};
use crate::cache::{CacheDecision, METRIC_CACHE_BYPASS_TOTAL, SitemapCache, SitemapCacheKey};
use crate::domain::entities::{ContentItem, SitemapDocument, SitemapPage};
use crate::util::gzip;

pub const METRIC_GENERATE_MS: &str = "sitemapper_generate_ms";

#[derive(Debug, Error)]
pub enum SitemapError {
    #[error("sitemap generation is disabled")]
    FeatureDisabled,
    #[error("sitemap page `{index}-{filename}` does not exist")]
    PageNotFound { index: u64, filename: String },
    #[error("malformed sitemap index: {0}")]
    InvalidIndex(String),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("failed to compress sitemap: {0}")]
    Compression(#[from] std::io::Error),
}

/// One sitemap request as seen by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SitemapRequest {
    /// Page of the sitemap index; `None` asks for the top-level document.
    pub index: Option<u64>,
    pub is_anonymous: bool,
}

impl SitemapRequest {
    pub fn top_level(is_anonymous: bool) -> Self {
        Self {
            index: None,
            is_anonymous,
        }
    }

    pub fn page(index: u64, is_anonymous: bool) -> Self {
        Self {
            index: Some(index),
            is_anonymous,
        }
    }

    /// Build a request from the raw `index` query parameter.
    pub fn parse(raw_index: Option<&str>, is_anonymous: bool) -> Result<Self, SitemapError> {
        let index = raw_index
            .map(parse_index)
            .transpose()
            .map_err(|err| SitemapError::InvalidIndex(err.to_string()))?;
        Ok(Self {
            index,
            is_anonymous,
        })
    }
}

/// Static description of the sitemap endpoint.
#[derive(Debug, Clone)]
pub struct SitemapConfig {
    pub enabled: bool,
    /// Absolute site URL without a trailing slash.
    pub base_url: String,
    /// Route the sitemap is served from, starting with `/`.
    pub path: String,
    /// Name recorded in the gzip header and in cache keys.
    pub filename: String,
    pub pages: PageConfig,
}

impl SitemapConfig {
    /// Public URL of the endpoint, used to link index pages.
    pub fn endpoint_url(&self) -> String {
        format!("{}{}", self.base_url, self.path)
    }

    /// Name stored inside the gzip container.
    pub fn archive_name(&self, index: Option<u64>) -> String {
        match index {
            Some(index) => format!("{index}-{}", self.filename),
            None => self.filename.clone(),
        }
    }
}

impl From<&crate::config::SitemapSettings> for SitemapConfig {
    fn from(settings: &crate::config::SitemapSettings) -> Self {
        Self {
            enabled: settings.enabled,
            base_url: settings.base_url.clone(),
            path: settings.path.clone(),
            filename: settings.filename.clone(),
            pages: settings.pages,
        }
    }
}

/// Service for generating sitemap documents.
#[derive(Clone)]
pub struct SitemapService {
    config: SitemapConfig,
    source: Arc<dyn ContentSource>,
    renderer: Arc<dyn SitemapRenderer>,
    cache: Option<Arc<SitemapCache>>,
}

impl SitemapService {
    pub fn new(
        config: SitemapConfig,
        source: Arc<dyn ContentSource>,
        renderer: Arc<dyn SitemapRenderer>,
        cache: Option<Arc<SitemapCache>>,
    ) -> Self {
        Self {
            config,
            source,
            renderer,
            cache,
        }
    }

    pub fn config(&self) -> &SitemapConfig {
        &self.config
    }

    pub fn ensure_enabled(&self) -> Result<(), SitemapError> {
        if self.config.enabled {
            Ok(())
        } else {
            Err(SitemapError::FeatureDisabled)
        }
    }

    /// Produce the compressed document for `request`.
    ///
    /// Anonymous requests are served from and stored into the cache; failures
    /// are never cached.
    #[instrument(
        skip_all,
        fields(index = ?request.index, anonymous = request.is_anonymous)
    )]
    pub async fn handle(&self, request: &SitemapRequest) -> Result<Bytes, SitemapError> {
        self.ensure_enabled()?;

        let key = match &self.cache {
            Some(cache) => match self.cache_key(request).await? {
                CacheDecision::Cacheable(key) => {
                    if let Some(body) = cache.get(&key) {
                        return Ok(body);
                    }
                    Some(key)
                }
                CacheDecision::Uncacheable => {
                    counter!(METRIC_CACHE_BYPASS_TOTAL).increment(1);
                    None
                }
            },
            None => None,
        };

        let body = self.generate(request.index).await?;

        if let (Some(cache), Some(key)) = (&self.cache, key) {
            cache.insert(key, body.clone());
        }

        Ok(body)
    }

    /// Cache-key policy: authenticated callers bypass the cache entirely,
    /// anonymous ones share documents per catalog version.
    pub async fn cache_key(
        &self,
        request: &SitemapRequest,
    ) -> Result<CacheDecision, SitemapError> {
        if !request.is_anonymous {
            return Ok(CacheDecision::Uncacheable);
        }

        let version = self.source.version().await?;
        Ok(CacheDecision::Cacheable(SitemapCacheKey {
            base_url: self.config.base_url.clone(),
            filename: self.config.filename.clone(),
            version,
            index: request.index,
        }))
    }

    /// Build, render and compress a document without consulting the cache.
    pub async fn generate(&self, index: Option<u64>) -> Result<Bytes, SitemapError> {
        let started = Instant::now();
        let cap = self.config.pages.max_total_items();

        let mut items = self.source.fetch(&CatalogQuery::default(), cap).await?;
        items.truncate(cap);

        let document = self.document(&items, index)?;
        let xml = match &document {
            SitemapDocument::Flat(entries) => self.renderer.render_flat(entries)?,
            SitemapDocument::Index(pages) => self.renderer.render_index(pages)?,
        };

        let archive_name = self.config.archive_name(index);
        let body = gzip::compress(&archive_name, xml.as_bytes())?;

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        histogram!(METRIC_GENERATE_MS).record(elapsed_ms);
        debug!(
            target = "sitemapper::sitemap",
            kind = document.kind().as_str(),
            items = items.len(),
            elements = document.len(),
            archive = %archive_name,
            compressed_bytes = body.len(),
            elapsed_ms,
            "generated sitemap"
        );

        Ok(Bytes::from(body))
    }

    /// Choose between a flat sitemap and an index over the ordered `items`.
    pub fn document(
        &self,
        items: &[ContentItem],
        index: Option<u64>,
    ) -> Result<SitemapDocument, SitemapError> {
        let layout = self
            .config
            .pages
            .plan(items.len(), index)
            .map_err(|err| match err {
                PaginationError::OutOfRange { index, .. } => SitemapError::PageNotFound {
                    index,
                    filename: self.config.filename.clone(),
                },
                PaginationError::InvalidIndex(raw) => SitemapError::InvalidIndex(raw),
            })?;

        let document = match layout {
            Layout::Flat(window) => SitemapDocument::Flat(
                items[window]
                    .iter()
                    .flat_map(ContentItem::entries)
                    .collect(),
            ),
            Layout::Index(windows) => {
                let endpoint = self.config.endpoint_url();
                SitemapDocument::Index(
                    windows
                        .into_iter()
                        .enumerate()
                        .map(|(page, window)| {
                            SitemapPage::new(
                                format!("{endpoint}?index={page}"),
                                items[window.start].last_modified,
                            )
                        })
                        .collect(),
                )
            }
        };
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use time::{Duration, OffsetDateTime, macros::datetime};

    use super::*;
    use crate::domain::entities::{SitemapEntry, SitemapPage};
    use crate::domain::types::ContentKind;

    struct FakeSource {
        items: Vec<ContentItem>,
        version: AtomicU64,
        fetches: AtomicUsize,
    }

    impl FakeSource {
        fn with_items(count: usize) -> Self {
            let newest: OffsetDateTime = datetime!(2011-01-01 00:00:00 UTC);
            let items = (0..count)
                .map(|n| {
                    ContentItem::new(
                        format!("http://nohost/plone/doc{n}"),
                        newest - Duration::hours(n as i64),
                        ContentKind::Page,
                    )
                })
                .collect();
            Self {
                items,
                version: AtomicU64::new(1),
                fetches: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ContentSource for FakeSource {
        async fn fetch(
            &self,
            _query: &CatalogQuery,
            limit: usize,
        ) -> Result<Vec<ContentItem>, SourceError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.items.iter().take(limit).cloned().collect())
        }

        async fn version(&self) -> Result<u64, SourceError> {
            Ok(self.version.load(Ordering::SeqCst))
        }
    }

    struct FailingSource;

    #[async_trait]
    impl ContentSource for FailingSource {
        async fn fetch(
            &self,
            _query: &CatalogQuery,
            _limit: usize,
        ) -> Result<Vec<ContentItem>, SourceError> {
            Err(SourceError::unavailable("catalog offline"))
        }

        async fn version(&self) -> Result<u64, SourceError> {
            Ok(1)
        }
    }

    /// Renders one line per element so tests can inspect the document.
    struct LineRenderer;

    impl SitemapRenderer for LineRenderer {
        fn render_flat(&self, entries: &[SitemapEntry]) -> Result<String, RenderError> {
            Ok(entries.iter().map(|e| format!("{}\n", e.loc)).collect())
        }

        fn render_index(&self, pages: &[SitemapPage]) -> Result<String, RenderError> {
            Ok(pages.iter().map(|p| format!("{}\n", p.url)).collect())
        }
    }

    /// Ignores the fetch limit and hands back everything it holds.
    struct GreedySource {
        inner: FakeSource,
        limit: AtomicUsize,
    }

    #[async_trait]
    impl ContentSource for GreedySource {
        async fn fetch(
            &self,
            _query: &CatalogQuery,
            limit: usize,
        ) -> Result<Vec<ContentItem>, SourceError> {
            self.limit.store(limit, Ordering::SeqCst);
            Ok(self.inner.items.clone())
        }

        async fn version(&self) -> Result<u64, SourceError> {
            Ok(1)
        }
    }

    fn lines(body: &[u8]) -> Vec<String> {
        use std::io::Read;

        let mut text = String::new();
        flate2::read::GzDecoder::new(body)
            .read_to_string(&mut text)
            .expect("valid gzip stream");
        text.lines().map(str::to_string).collect()
    }

    fn capped_service(source: Arc<dyn ContentSource>) -> SitemapService {
        let mut config = config(5);
        config.pages = PageConfig::new(
            NonZeroUsize::new(5).expect("non-zero"),
            NonZeroUsize::new(10).expect("non-zero"),
        )
        .expect("page config");
        SitemapService::new(config, source, Arc::new(LineRenderer), None)
    }

    fn config(page: usize) -> SitemapConfig {
        SitemapConfig {
            enabled: true,
            base_url: "http://nohost/plone".to_string(),
            path: "/sitemap.xml.gz".to_string(),
            filename: "sitemap.xml".to_string(),
            pages: PageConfig::with_page_size(NonZeroUsize::new(page).expect("non-zero")),
        }
    }

    fn service(source: Arc<dyn ContentSource>, cache: bool) -> SitemapService {
        let cache = cache.then(|| Arc::new(SitemapCache::new(&Default::default())));
        SitemapService::new(config(5), source, Arc::new(LineRenderer), cache)
    }

    fn document(items: usize, index: Option<u64>) -> Result<SitemapDocument, SitemapError> {
        let source = FakeSource::with_items(items);
        let items = source.items.clone();
        service(Arc::new(source), false).document(&items, index)
    }

    #[test]
    fn index_lists_one_page_per_window() {
        let SitemapDocument::Index(pages) = document(12, None).expect("document") else {
            panic!("expected sitemap index");
        };
        let urls: Vec<&str> = pages.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "http://nohost/plone/sitemap.xml.gz?index=0",
                "http://nohost/plone/sitemap.xml.gz?index=1",
                "http://nohost/plone/sitemap.xml.gz?index=2",
            ]
        );
        // First item of each window is the newest of that page
        assert_eq!(pages[0].maxdate, "2011-01-01T00:00:00+00:00");
        assert_eq!(pages[1].maxdate, "2010-12-31T19:00:00+00:00");
        assert_eq!(pages[2].maxdate, "2010-12-31T14:00:00+00:00");
    }

    #[test]
    fn last_page_holds_remaining_items() {
        let SitemapDocument::Flat(entries) = document(12, Some(2)).expect("document") else {
            panic!("expected flat sitemap");
        };
        let locs: Vec<&str> = entries.iter().map(|e| e.loc.as_str()).collect();
        assert_eq!(
            locs,
            vec!["http://nohost/plone/doc10", "http://nohost/plone/doc11"]
        );
    }

    #[test]
    fn page_past_the_end_is_not_found() {
        assert!(matches!(
            document(12, Some(3)),
            Err(SitemapError::PageNotFound { index: 3, ref filename }) if filename == "sitemap.xml"
        ));
    }

    #[test]
    fn small_catalog_is_flat() {
        let doc = document(4, None).expect("document");
        assert_eq!(doc.kind(), crate::domain::types::DocumentKind::Flat);
        assert_eq!(doc.len(), 4);
    }

    #[test]
    fn request_parse_rejects_malformed_index() {
        assert_eq!(
            SitemapRequest::parse(Some("1"), true).expect("request"),
            SitemapRequest::page(1, true)
        );
        assert_eq!(
            SitemapRequest::parse(None, false).expect("request"),
            SitemapRequest::top_level(false)
        );
        assert!(matches!(
            SitemapRequest::parse(Some("x"), true),
            Err(SitemapError::InvalidIndex(_))
        ));
    }

    #[tokio::test]
    async fn disabled_feature_never_touches_source() {
        let source = Arc::new(FakeSource::with_items(3));
        let mut config = config(5);
        config.enabled = false;
        let service = SitemapService::new(config, source.clone(), Arc::new(LineRenderer), None);

        let result = service.handle(&SitemapRequest::top_level(true)).await;
        assert!(matches!(result, Err(SitemapError::FeatureDisabled)));
        assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn anonymous_requests_reuse_cached_bytes() {
        let source = Arc::new(FakeSource::with_items(3));
        let service = service(source.clone(), true);
        let request = SitemapRequest::top_level(true);

        let first = service.handle(&request).await.expect("first");
        let second = service.handle(&request).await.expect("second");

        assert_eq!(first, second);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn uncached_generation_is_byte_identical() {
        let service = service(Arc::new(FakeSource::with_items(12)), false);
        for index in [None, Some(0), Some(2)] {
            let first = service.generate(index).await.expect("first");
            let second = service.generate(index).await.expect("second");
            assert_eq!(first, second);
        }
    }

    #[tokio::test]
    async fn total_items_cap_limits_index_pages() {
        let service = capped_service(Arc::new(FakeSource::with_items(12)));

        let index = lines(&service.generate(None).await.expect("index"));
        assert_eq!(
            index,
            vec![
                "http://nohost/plone/sitemap.xml.gz?index=0",
                "http://nohost/plone/sitemap.xml.gz?index=1",
            ]
        );

        let page = lines(&service.generate(Some(1)).await.expect("page"));
        assert_eq!(page.len(), 5);
        assert_eq!(page.last().map(String::as_str), Some("http://nohost/plone/doc9"));

        assert!(matches!(
            service.generate(Some(2)).await,
            Err(SitemapError::PageNotFound { index: 2, .. })
        ));
    }

    #[tokio::test]
    async fn oversized_fetch_is_truncated_to_cap() {
        let source = Arc::new(GreedySource {
            inner: FakeSource::with_items(12),
            limit: AtomicUsize::new(0),
        });
        let service = capped_service(source.clone());

        let index = lines(&service.generate(None).await.expect("index"));
        assert_eq!(index.len(), 2);
        assert_eq!(source.limit.load(Ordering::SeqCst), 10);

        let page = lines(&service.generate(Some(1)).await.expect("page"));
        assert!(!page.iter().any(|loc| loc.ends_with("/doc10")));
        assert!(matches!(
            service.generate(Some(2)).await,
            Err(SitemapError::PageNotFound { index: 2, .. })
        ));
    }

    #[tokio::test]
    async fn version_bump_recomputes() {
        let source = Arc::new(FakeSource::with_items(3));
        let service = service(source.clone(), true);
        let request = SitemapRequest::top_level(true);

        service.handle(&request).await.expect("first");
        source.version.fetch_add(1, Ordering::SeqCst);
        service.handle(&request).await.expect("second");

        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn authenticated_requests_bypass_cache() {
        let source = Arc::new(FakeSource::with_items(3));
        let service = service(source.clone(), true);

        assert_eq!(
            service
                .cache_key(&SitemapRequest::top_level(false))
                .await
                .expect("decision"),
            CacheDecision::Uncacheable
        );

        service
            .handle(&SitemapRequest::top_level(false))
            .await
            .expect("authenticated");
        service
            .handle(&SitemapRequest::top_level(false))
            .await
            .expect("authenticated again");
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
        assert!(service.cache.as_ref().expect("cache").is_empty());
    }

    #[tokio::test]
    async fn cache_key_carries_version_and_index() {
        let source = Arc::new(FakeSource::with_items(3));
        source.version.store(42, Ordering::SeqCst);
        let service = service(source, true);

        let decision = service
            .cache_key(&SitemapRequest::page(1, true))
            .await
            .expect("decision");
        let key = decision.key().expect("cacheable");
        assert_eq!(key.to_string(), "http://nohost/plone/sitemap.xml/42/1");
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let source = Arc::new(FakeSource::with_items(12));
        let service = service(source, true);

        let result = service.handle(&SitemapRequest::page(3, true)).await;
        assert!(matches!(result, Err(SitemapError::PageNotFound { .. })));
        assert!(service.cache.as_ref().expect("cache").is_empty());

        let failing = SitemapService::new(
            config(5),
            Arc::new(FailingSource),
            Arc::new(LineRenderer),
            Some(Arc::new(SitemapCache::new(&Default::default()))),
        );
        let result = failing.handle(&SitemapRequest::top_level(true)).await;
        assert!(matches!(result, Err(SitemapError::Source(_))));
        assert!(failing.cache.as_ref().expect("cache").is_empty());
    }
}
