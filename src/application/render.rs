//! Renderer seam for sitemap documents.

use thiserror::Error;

use crate::domain::entities::{SitemapEntry, SitemapPage};

#[derive(Debug, Error)]
#[error("failed to render sitemap template: {0}")]
pub struct RenderError(pub String);

/// Turns sitemap entries into XML text.
pub trait SitemapRenderer: Send + Sync {
    /// `<urlset>` document, one `<url>` per entry.
    fn render_flat(&self, entries: &[SitemapEntry]) -> Result<String, RenderError>;

    /// `<sitemapindex>` document, one `<sitemap>` per page.
    fn render_index(&self, pages: &[SitemapPage]) -> Result<String, RenderError>;
}
