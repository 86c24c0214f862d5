//! Shared domain enumerations.

use serde::Deserialize;

/// Kind of catalog object behind a sitemap URL.
///
/// The kind only matters for entry expansion: images are listed through their
/// view page, files through both the view page and the raw download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Page,
    File,
    Image,
    #[serde(other)]
    Other,
}

impl ContentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Page => "page",
            ContentKind::File => "file",
            ContentKind::Image => "image",
            ContentKind::Other => "other",
        }
    }
}

/// Which of the two sitemap schemas a document follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Flat,
    Index,
}

impl DocumentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentKind::Flat => "flat",
            DocumentKind::Index => "index",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Modified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Ascending,
    Reverse,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguageFilter {
    All,
    Only(String),
}
