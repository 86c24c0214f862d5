use askama::{Error as AskamaError, Template};

use crate::application::render::{RenderError, SitemapRenderer};
use crate::domain::entities::{SitemapEntry, SitemapPage};

#[derive(Template)]
#[template(path = "sitemap.xml", escape = "html")]
pub struct SitemapTemplate<'a> {
    pub entries: &'a [SitemapEntry],
}

#[derive(Template)]
#[template(path = "sitemapindex.xml", escape = "html")]
pub struct SitemapIndexTemplate<'a> {
    pub pages: &'a [SitemapPage],
}

/// Renders sitemap documents from the bundled askama templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateRenderer;

impl SitemapRenderer for TemplateRenderer {
    fn render_flat(&self, entries: &[SitemapEntry]) -> Result<String, RenderError> {
        SitemapTemplate { entries }.render().map_err(render_error)
    }

    fn render_index(&self, pages: &[SitemapPage]) -> Result<String, RenderError> {
        SitemapIndexTemplate { pages }.render().map_err(render_error)
    }
}

fn render_error(error: AskamaError) -> RenderError {
    RenderError(error.to_string())
}
