//! Gzip-compressed XML sitemaps and sitemap indexes for a content catalog.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
pub mod util;
