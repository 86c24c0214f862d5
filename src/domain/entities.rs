//! Values flowing from the content catalog into rendered sitemaps.

use time::OffsetDateTime;

use crate::domain::types::{ContentKind, DocumentKind};
use crate::util::datetime::{format_w3c, format_zulu};

/// Snapshot of one catalog object taken at query time.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentItem {
    pub url: String,
    pub last_modified: OffsetDateTime,
    pub kind: ContentKind,
}

impl ContentItem {
    pub fn new(url: impl Into<String>, last_modified: OffsetDateTime, kind: ContentKind) -> Self {
        Self {
            url: url.into(),
            last_modified,
            kind,
        }
    }

    /// Expand the item into the `<url>` entries it contributes to a flat sitemap.
    ///
    /// Images are listed through their view page only; files are listed through
    /// the view page followed by the raw download.
    pub fn entries(&self) -> Vec<SitemapEntry> {
        let lastmod = format_zulu(self.last_modified);
        let view = || SitemapEntry {
            loc: format!("{}/view", self.url),
            lastmod: lastmod.clone(),
        };
        let raw = || SitemapEntry {
            loc: self.url.clone(),
            lastmod: lastmod.clone(),
        };

        match self.kind {
            ContentKind::Image => vec![view()],
            ContentKind::File => vec![view(), raw()],
            ContentKind::Page | ContentKind::Other => vec![raw()],
        }
    }
}

/// One `<url>` element of a flat sitemap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapEntry {
    pub loc: String,
    pub lastmod: String,
}

/// One `<sitemap>` element of a sitemap index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapPage {
    pub url: String,
    pub maxdate: String,
}

impl SitemapPage {
    pub fn new(url: String, newest: OffsetDateTime) -> Self {
        Self {
            url,
            maxdate: format_w3c(newest),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapDocument {
    Flat(Vec<SitemapEntry>),
    Index(Vec<SitemapPage>),
}

impl SitemapDocument {
    pub fn kind(&self) -> DocumentKind {
        match self {
            SitemapDocument::Flat(_) => DocumentKind::Flat,
            SitemapDocument::Index(_) => DocumentKind::Index,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SitemapDocument::Flat(entries) => entries.len(),
            SitemapDocument::Index(pages) => pages.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn item(url: &str, kind: ContentKind) -> ContentItem {
        ContentItem::new(url, datetime!(2010-12-14 10:53:21 UTC), kind)
    }

    #[test]
    fn files_list_view_page_and_download() {
        let locs: Vec<String> = item("http://x/file1", ContentKind::File)
            .entries()
            .into_iter()
            .map(|entry| entry.loc)
            .collect();
        assert_eq!(locs, vec!["http://x/file1/view", "http://x/file1"]);
    }

    #[test]
    fn images_list_only_view_page() {
        let locs: Vec<String> = item("http://x/image1", ContentKind::Image)
            .entries()
            .into_iter()
            .map(|entry| entry.loc)
            .collect();
        assert_eq!(locs, vec!["http://x/image1/view"]);
    }

    #[test]
    fn pages_list_plain_url() {
        let entries = item("http://x/front", ContentKind::Page).entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].loc, "http://x/front");
        assert_eq!(entries[0].lastmod, "2010-12-14T10:53:21Z");
    }
}
