use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Arc;

use metrics_util::debugging::DebuggingRecorder;
use sitemapper::{
    application::{
        pagination::PageConfig,
        sitemap::{SitemapConfig, SitemapRequest, SitemapService},
    },
    cache::{CacheConfig, SitemapCache},
    domain::{entities::ContentItem, types::ContentKind},
    infra::catalog::InMemoryCatalog,
    presentation::views::TemplateRenderer,
};
use time::macros::datetime;

#[tokio::test]
async fn sitemap_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let catalog = Arc::new(InMemoryCatalog::new(vec![ContentItem::new(
        "http://nohost/plone/doc",
        datetime!(2010-12-14 10:53:21 UTC),
        ContentKind::Page,
    )]));
    let cache_config = CacheConfig {
        capacity: 1,
        ..Default::default()
    };
    let service = SitemapService::new(
        SitemapConfig {
            enabled: true,
            base_url: "http://nohost/plone".to_string(),
            path: "/sitemap.xml.gz".to_string(),
            filename: "sitemap.xml".to_string(),
            pages: PageConfig::with_page_size(NonZeroUsize::new(5).expect("non-zero")),
        },
        catalog.clone(),
        Arc::new(TemplateRenderer),
        Some(Arc::new(SitemapCache::new(&cache_config))),
    );

    // miss, then hit
    let anonymous = SitemapRequest::top_level(true);
    service.handle(&anonymous).await.expect("first");
    service.handle(&anonymous).await.expect("cached");

    // new version evicts the single cached document
    catalog.replace(Vec::new());
    service.handle(&anonymous).await.expect("after bump");

    // authenticated requests bypass the cache
    service
        .handle(&SitemapRequest::top_level(false))
        .await
        .expect("authenticated");

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "sitemapper_cache_hit_total",
        "sitemapper_cache_miss_total",
        "sitemapper_cache_evict_total",
        "sitemapper_cache_bypass_total",
        "sitemapper_generate_ms",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
