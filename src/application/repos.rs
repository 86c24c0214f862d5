//! Collaborator traits describing the content catalog.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::ContentItem;
use crate::domain::types::{LanguageFilter, SortKey, SortOrder};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("content source unavailable: {0}")]
    Unavailable(String),
}

impl SourceError {
    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// Catalog query issued for every sitemap.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CatalogQuery {
    pub sort_on: SortKey,
    pub sort_order: SortOrder,
    pub language: LanguageFilter,
}

impl Default for CatalogQuery {
    /// Every language, newest modification first.
    fn default() -> Self {
        Self {
            sort_on: SortKey::Modified,
            sort_order: SortOrder::Reverse,
            language: LanguageFilter::All,
        }
    }
}

/// Read side of a content catalog.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Return at most `limit` items in the order requested by `query`.
    async fn fetch(
        &self,
        query: &CatalogQuery,
        limit: usize,
    ) -> Result<Vec<ContentItem>, SourceError>;

    /// Counter that changes whenever the catalog content changes.
    async fn version(&self) -> Result<u64, SourceError>;
}
