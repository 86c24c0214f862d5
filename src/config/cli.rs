use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the sitemapper binary.
#[derive(Debug, Parser)]
#[command(
    name = "sitemapper",
    version,
    about = "Gzip-compressed XML sitemaps for a content catalog"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "SITEMAPPER_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the sitemap HTTP service.
    Serve(Box<ServeArgs>),
    /// Render one sitemap document from the catalog to a file.
    Generate(GenerateArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct SitemapOverrides {
    /// Override the public site URL that sitemap links are built from.
    #[arg(long = "sitemap-base-url", value_name = "URL")]
    pub base_url: Option<String>,

    /// Override the number of catalog items per sitemap page.
    #[arg(long = "sitemap-max-items-per-page", value_name = "COUNT")]
    pub max_items_per_page: Option<u64>,

    /// Override the cap on catalog items considered for the sitemap.
    #[arg(long = "sitemap-max-total-items", value_name = "COUNT")]
    pub max_total_items: Option<u64>,

    /// Override the catalog file path.
    #[arg(long = "catalog-path", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub catalog_path: Option<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub sitemap: SitemapOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Toggle sitemap generation.
    #[arg(
        long = "sitemap-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub sitemap_enabled: Option<bool>,

    /// Toggle the anonymous response cache.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enabled: Option<bool>,

    /// Override the number of cached sitemap documents.
    #[arg(long = "cache-capacity", value_name = "COUNT")]
    pub cache_capacity: Option<u64>,

    /// Override the catalog reload cadence.
    #[arg(long = "catalog-reload-interval-seconds", value_name = "SECONDS")]
    pub catalog_reload_interval_seconds: Option<u64>,
}

#[derive(Debug, Args, Clone)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub sitemap: SitemapOverrides,

    /// Sitemap index page to render; omit for the top-level document.
    #[arg(long, value_name = "N")]
    pub index: Option<u64>,

    /// Destination file; the compressed document is written to stdout when omitted.
    #[arg(long, short = 'o', value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,
}
