//! Content catalog adapters.
//!
//! [`InMemoryCatalog`] keeps a snapshot of catalog records and bumps its
//! version on every replacement. [`FileCatalog`] loads that snapshot from a
//! JSON document and reloads it when the file's modification time changes:
//!
//! ```json
//! [
//!   {"url": "http://nohost/plone/doc", "modified": "2010-12-14T10:53:21Z", "kind": "page"},
//!   {"url": "http://nohost/plone/pic.png", "modified": "2010-12-13T08:00:00Z", "kind": "image", "language": "de"}
//! ]
//! ```

use std::{
    path::{Path, PathBuf},
    sync::{
        PoisonError, RwLock,
        atomic::{AtomicU64, Ordering},
    },
    time::SystemTime,
};

use async_trait::async_trait;
use serde::Deserialize;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::application::repos::{CatalogQuery, ContentSource, SourceError};
use crate::domain::entities::ContentItem;
use crate::domain::types::{ContentKind, LanguageFilter, SortKey, SortOrder};

use super::error::InfraError;

/// One catalog object together with its language tag.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CatalogRecord {
    pub url: String,
    #[serde(with = "time::serde::rfc3339")]
    pub modified: OffsetDateTime,
    #[serde(default = "default_kind")]
    pub kind: ContentKind,
    #[serde(default)]
    pub language: Option<String>,
}

fn default_kind() -> ContentKind {
    ContentKind::Page
}

impl CatalogRecord {
    fn matches(&self, filter: &LanguageFilter) -> bool {
        match filter {
            LanguageFilter::All => true,
            LanguageFilter::Only(language) => self.language.as_deref() == Some(language.as_str()),
        }
    }

    fn to_item(&self) -> ContentItem {
        ContentItem::new(self.url.clone(), self.modified, self.kind)
    }
}

impl From<ContentItem> for CatalogRecord {
    fn from(item: ContentItem) -> Self {
        Self {
            url: item.url,
            modified: item.last_modified,
            kind: item.kind,
            language: None,
        }
    }
}

/// Catalog held in memory.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    records: RwLock<Vec<CatalogRecord>>,
    version: AtomicU64,
}

impl InMemoryCatalog {
    pub fn new(items: Vec<ContentItem>) -> Self {
        Self::from_records(items.into_iter().map(CatalogRecord::from).collect())
    }

    pub fn from_records(records: Vec<CatalogRecord>) -> Self {
        Self {
            records: RwLock::new(records),
            version: AtomicU64::new(1),
        }
    }

    /// Swap the catalog content, returning the new version.
    pub fn replace(&self, items: Vec<ContentItem>) -> u64 {
        self.replace_records(items.into_iter().map(CatalogRecord::from).collect())
    }

    pub fn replace_records(&self, records: Vec<CatalogRecord>) -> u64 {
        let mut guard = self
            .records
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = records;
        self.version.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn current_version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    fn query(&self, query: &CatalogQuery, limit: usize) -> Vec<ContentItem> {
        let guard = self.records.read().unwrap_or_else(PoisonError::into_inner);
        let mut matched: Vec<&CatalogRecord> = guard
            .iter()
            .filter(|record| record.matches(&query.language))
            .collect();

        // Stable in both directions: ties keep catalog order.
        matched.sort_by(|a, b| {
            let ordering = match query.sort_on {
                SortKey::Modified => a.modified.cmp(&b.modified),
            };
            match query.sort_order {
                SortOrder::Ascending => ordering,
                SortOrder::Reverse => ordering.reverse(),
            }
        });

        matched
            .into_iter()
            .take(limit)
            .map(CatalogRecord::to_item)
            .collect()
    }
}

#[async_trait]
impl ContentSource for InMemoryCatalog {
    async fn fetch(
        &self,
        query: &CatalogQuery,
        limit: usize,
    ) -> Result<Vec<ContentItem>, SourceError> {
        Ok(self.query(query, limit))
    }

    async fn version(&self) -> Result<u64, SourceError> {
        Ok(self.current_version())
    }
}

/// Catalog backed by a JSON file on disk.
#[derive(Debug)]
pub struct FileCatalog {
    path: PathBuf,
    inner: InMemoryCatalog,
    loaded_mtime: Mutex<Option<SystemTime>>,
}

impl FileCatalog {
    /// Load the catalog file; a missing or malformed file is an error.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, InfraError> {
        let path = path.into();
        let (records, mtime) = load_records(&path).await?;
        info!(
            target = "sitemapper::catalog",
            path = %path.display(),
            items = records.len(),
            "loaded catalog"
        );
        Ok(Self {
            path,
            inner: InMemoryCatalog::from_records(records),
            loaded_mtime: Mutex::new(mtime),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Reload the file if its modification time changed since the last load.
    ///
    /// Returns whether the catalog content was replaced. On error the previous
    /// snapshot stays in place.
    pub async fn refresh(&self) -> Result<bool, InfraError> {
        let mut loaded = self.loaded_mtime.lock().await;

        let current = tokio::fs::metadata(&self.path).await?.modified().ok();
        if current.is_some() && current == *loaded {
            return Ok(false);
        }

        let (records, mtime) = load_records(&self.path).await?;
        let items = records.len();
        let version = self.inner.replace_records(records);
        *loaded = mtime;

        info!(
            target = "sitemapper::catalog",
            path = %self.path.display(),
            items,
            version,
            "reloaded catalog"
        );
        Ok(true)
    }
}

#[async_trait]
impl ContentSource for FileCatalog {
    async fn fetch(
        &self,
        query: &CatalogQuery,
        limit: usize,
    ) -> Result<Vec<ContentItem>, SourceError> {
        self.inner.fetch(query, limit).await
    }

    async fn version(&self) -> Result<u64, SourceError> {
        self.inner.version().await
    }
}

async fn load_records(
    path: &Path,
) -> Result<(Vec<CatalogRecord>, Option<SystemTime>), InfraError> {
    let mtime = tokio::fs::metadata(path).await?.modified().ok();
    let raw = tokio::fs::read(path).await?;
    let records: Vec<CatalogRecord> = serde_json::from_slice(&raw).map_err(|err| {
        InfraError::catalog(format!("failed to parse `{}`: {err}", path.display()))
    })?;
    debug!(
        target = "sitemapper::catalog",
        path = %path.display(),
        bytes = raw.len(),
        "read catalog file"
    );
    Ok((records, mtime))
}
