//! Presentation layer: askama templates for sitemap documents.

pub mod views;
