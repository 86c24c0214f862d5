//! Page-size policy and window planning for sitemap indexes.

use std::{num::NonZeroUsize, ops::Range};

use thiserror::Error;

use crate::domain::error::DomainError;

/// Default number of catalog items per sitemap page.
pub const DEFAULT_MAX_ITEMS_PER_PAGE: usize = 1000;

/// Number of pages whose worth of items the catalog is asked for when no
/// explicit total cap is configured.
pub const TOTAL_ITEMS_PAGE_FACTOR: usize = 1000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaginationError {
    #[error("sitemap index `{0}` is not a non-negative integer")]
    InvalidIndex(String),
    #[error("sitemap page {index} is out of range ({pages} pages available)")]
    OutOfRange { index: u64, pages: usize },
}

/// Sitemap page sizing.
///
/// Invariant: `max_total_items >= max_items_per_page`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageConfig {
    max_items_per_page: NonZeroUsize,
    max_total_items: NonZeroUsize,
}

impl PageConfig {
    pub fn new(
        max_items_per_page: NonZeroUsize,
        max_total_items: NonZeroUsize,
    ) -> Result<Self, DomainError> {
        if max_total_items < max_items_per_page {
            return Err(DomainError::validation(format!(
                "max_total_items ({max_total_items}) must be at least max_items_per_page ({max_items_per_page})"
            )));
        }
        Ok(Self {
            max_items_per_page,
            max_total_items,
        })
    }

    /// Page size with the total cap derived as `page size * 1000`.
    pub fn with_page_size(max_items_per_page: NonZeroUsize) -> Self {
        let max_total_items = max_items_per_page.saturating_mul(
            NonZeroUsize::new(TOTAL_ITEMS_PAGE_FACTOR).unwrap_or(NonZeroUsize::MIN),
        );
        Self {
            max_items_per_page,
            max_total_items,
        }
    }

    pub fn max_items_per_page(&self) -> usize {
        self.max_items_per_page.get()
    }

    pub fn max_total_items(&self) -> usize {
        self.max_total_items.get()
    }

    /// Number of pages needed to list `total` items.
    pub fn page_count(&self, total: usize) -> usize {
        total.div_ceil(self.max_items_per_page())
    }

    /// Window of page `index`, or `None` when it starts at or past `total`.
    pub fn window(&self, index: u64, total: usize) -> Option<Range<usize>> {
        let index = usize::try_from(index).ok()?;
        let start = index.checked_mul(self.max_items_per_page())?;
        if start >= total {
            return None;
        }
        let end = start.saturating_add(self.max_items_per_page()).min(total);
        Some(start..end)
    }

    /// Decide which document a request for `index` over `total` items yields.
    pub fn plan(&self, total: usize, index: Option<u64>) -> Result<Layout, PaginationError> {
        match index {
            None if total < self.max_items_per_page() => Ok(Layout::Flat(0..total)),
            None => {
                let pages = (0..self.page_count(total))
                    .map(|page| {
                        let start = page * self.max_items_per_page();
                        start..(start + self.max_items_per_page()).min(total)
                    })
                    .collect();
                Ok(Layout::Index(pages))
            }
            Some(index) => self
                .window(index, total)
                .map(Layout::Flat)
                .ok_or(PaginationError::OutOfRange {
                    index,
                    pages: self.page_count(total),
                }),
        }
    }
}

impl Default for PageConfig {
    fn default() -> Self {
        Self::with_page_size(
            NonZeroUsize::new(DEFAULT_MAX_ITEMS_PER_PAGE).unwrap_or(NonZeroUsize::MIN),
        )
    }
}

/// Planned document shape: a single window, or one window per index page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
    Flat(Range<usize>),
    Index(Vec<Range<usize>>),
}

/// Parse the raw `index` query value.
pub fn parse_index(raw: &str) -> Result<u64, PaginationError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| PaginationError::InvalidIndex(raw.to_string()))
}
