//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{
    net::SocketAddr,
    num::NonZeroUsize,
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::application::pagination::{DEFAULT_MAX_ITEMS_PER_PAGE, PageConfig};

pub use cli::{CliArgs, Command, GenerateArgs, ServeArgs, ServeOverrides, SitemapOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "sitemapper";
const ENV_PREFIX: &str = "SITEMAPPER";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_SITEMAP_PATH: &str = "/sitemap.xml.gz";
const DEFAULT_SITEMAP_FILENAME: &str = "sitemap.xml";
const DEFAULT_CACHE_CAPACITY: u64 = 64;
const DEFAULT_CATALOG_RELOAD_SECS: u64 = 30;
const DEFAULT_SESSION_COOKIE: &str = "__ac";
pub(crate) const HEALTH_PATH: &str = "/_health";

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub sitemap: SitemapSettings,
    pub cache: CacheSettings,
    pub catalog: CatalogSettings,
    pub http: HttpSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct SitemapSettings {
    pub enabled: bool,
    /// Absolute site URL, without trailing slash.
    pub base_url: String,
    pub path: String,
    pub filename: String,
    pub pages: PageConfig,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub capacity: NonZeroUsize,
}

#[derive(Debug, Clone)]
pub struct CatalogSettings {
    pub path: Option<PathBuf>,
    pub reload_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Cookie whose presence marks a request as authenticated.
    pub session_cookie: String,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Generate(args)) => raw.apply_sitemap_overrides(&args.sitemap),
        None => {}
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    sitemap: RawSitemapSettings,
    cache: RawCacheSettings,
    catalog: RawCatalogSettings,
    http: RawHttpSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(enabled) = overrides.sitemap_enabled {
            self.sitemap.enabled = Some(enabled);
        }
        if let Some(enabled) = overrides.cache_enabled {
            self.cache.enabled = Some(enabled);
        }
        if let Some(capacity) = overrides.cache_capacity {
            self.cache.capacity = Some(capacity);
        }
        if let Some(seconds) = overrides.catalog_reload_interval_seconds {
            self.catalog.reload_interval_seconds = Some(seconds);
        }

        self.apply_sitemap_overrides(&overrides.sitemap);
    }

    fn apply_sitemap_overrides(&mut self, overrides: &SitemapOverrides) {
        if let Some(url) = overrides.base_url.as_ref() {
            self.sitemap.base_url = Some(url.clone());
        }
        if let Some(count) = overrides.max_items_per_page {
            self.sitemap.max_items_per_page = Some(count);
        }
        if let Some(count) = overrides.max_total_items {
            self.sitemap.max_total_items = Some(count);
        }
        if let Some(path) = overrides.catalog_path.as_ref() {
            self.catalog.path = Some(path.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            sitemap,
            cache,
            catalog,
            http,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let sitemap = build_sitemap_settings(sitemap, &server)?;
        let cache = build_cache_settings(cache)?;
        let catalog = build_catalog_settings(catalog)?;
        let http = build_http_settings(http)?;

        Ok(Self {
            server,
            logging,
            sitemap,
            cache,
            catalog,
            http,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_sitemap_settings(
    sitemap: RawSitemapSettings,
    server: &ServerSettings,
) -> Result<SitemapSettings, LoadError> {
    let base_url = match sitemap.base_url {
        Some(raw) => normalize_base_url(&raw)
            .map_err(|reason| LoadError::invalid("sitemap.base_url", reason))?,
        None => format!("http://{}", server.addr),
    };

    let path = sitemap
        .path
        .unwrap_or_else(|| DEFAULT_SITEMAP_PATH.to_string());
    if !path.starts_with('/') || path.len() < 2 {
        return Err(LoadError::invalid(
            "sitemap.path",
            "must start with `/` and name a resource",
        ));
    }
    if path.contains(['?', '#']) {
        return Err(LoadError::invalid(
            "sitemap.path",
            "must not contain a query or fragment",
        ));
    }
    if path == HEALTH_PATH {
        return Err(LoadError::invalid(
            "sitemap.path",
            format!("`{HEALTH_PATH}` is reserved"),
        ));
    }

    let filename = sitemap
        .filename
        .unwrap_or_else(|| DEFAULT_SITEMAP_FILENAME.to_string());
    if filename.trim().is_empty() || filename.contains('/') {
        return Err(LoadError::invalid(
            "sitemap.filename",
            "must be a non-empty name without `/`",
        ));
    }

    let per_page = non_zero_usize(
        sitemap
            .max_items_per_page
            .unwrap_or(DEFAULT_MAX_ITEMS_PER_PAGE as u64),
        "sitemap.max_items_per_page",
    )?;
    let pages = match sitemap.max_total_items {
        Some(total) => {
            let total = non_zero_usize(total, "sitemap.max_total_items")?;
            PageConfig::new(per_page, total)
                .map_err(|err| LoadError::invalid("sitemap.max_total_items", err.to_string()))?
        }
        None => PageConfig::with_page_size(per_page),
    };

    Ok(SitemapSettings {
        enabled: sitemap.enabled.unwrap_or(true),
        base_url,
        path,
        filename,
        pages,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let capacity = non_zero_usize(
        cache.capacity.unwrap_or(DEFAULT_CACHE_CAPACITY),
        "cache.capacity",
    )?;

    Ok(CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        capacity,
    })
}

fn build_catalog_settings(catalog: RawCatalogSettings) -> Result<CatalogSettings, LoadError> {
    let path = catalog.path.filter(|path| !path.as_os_str().is_empty());

    let reload_secs = catalog
        .reload_interval_seconds
        .unwrap_or(DEFAULT_CATALOG_RELOAD_SECS);
    if reload_secs == 0 {
        return Err(LoadError::invalid(
            "catalog.reload_interval_seconds",
            "must be greater than zero",
        ));
    }

    Ok(CatalogSettings {
        path,
        reload_interval: Duration::from_secs(reload_secs),
    })
}

fn build_http_settings(http: RawHttpSettings) -> Result<HttpSettings, LoadError> {
    let session_cookie = http
        .session_cookie
        .unwrap_or_else(|| DEFAULT_SESSION_COOKIE.to_string());
    if session_cookie.trim().is_empty() {
        return Err(LoadError::invalid(
            "http.session_cookie",
            "must not be empty",
        ));
    }

    Ok(HttpSettings { session_cookie })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSitemapSettings {
    enabled: Option<bool>,
    base_url: Option<String>,
    path: Option<String>,
    filename: Option<String>,
    max_items_per_page: Option<u64>,
    max_total_items: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    capacity: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCatalogSettings {
    path: Option<PathBuf>,
    reload_interval_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawHttpSettings {
    session_cookie: Option<String>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn normalize_base_url(raw: &str) -> Result<String, String> {
    let url = Url::parse(raw.trim()).map_err(|err| format!("invalid URL `{raw}`: {err}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme `{}`", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("URL must include a host".to_string());
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err("URL must not carry a query or fragment".to_string());
    }
    Ok(url.as_str().trim_end_matches('/').to_string())
}

fn non_zero_usize(value: u64, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    let value: usize = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for usize"))?;
    NonZeroUsize::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}
