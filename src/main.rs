use std::{future::IntoFuture, io::Write, process, sync::Arc, time::Duration};

use sitemapper::{
    application::{
        error::AppError,
        repos::ContentSource,
        sitemap::{SitemapConfig, SitemapRequest, SitemapService},
    },
    cache::{CacheConfig, SitemapCache},
    config::{self, GenerateArgs},
    infra::{
        catalog::{FileCatalog, InMemoryCatalog},
        error::InfraError,
        http::{self, HttpState},
        telemetry,
    },
    presentation::views::TemplateRenderer,
};
use tokio::{sync::oneshot, task::JoinHandle};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(std::io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Generate(args) => run_generate(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let (source, file_catalog) = open_catalog(&settings.catalog).await?;

    let reload_handle = file_catalog
        .map(|catalog| spawn_catalog_reload(catalog, settings.catalog.reload_interval));

    let cache_config = CacheConfig::from(&settings.cache);
    let cache = cache_config
        .enabled
        .then(|| Arc::new(SitemapCache::new(&cache_config)));

    let sitemap = Arc::new(SitemapService::new(
        SitemapConfig::from(&settings.sitemap),
        source,
        Arc::new(TemplateRenderer),
        cache,
    ));
    let state = HttpState {
        sitemap,
        session_cookie: Arc::from(settings.http.session_cookie.as_str()),
    };
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        addr = %settings.server.addr,
        path = %settings.sitemap.path,
        enabled = settings.sitemap.enabled,
        cache = cache_config.enabled,
        "sitemapper listening"
    );

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        })
        .into_future();
    let mut server = tokio::spawn(server);

    let result = tokio::select! {
        result = &mut server => Some(result),
        _ = shutdown_signal() => None,
    };

    let result = match result {
        Some(result) => result,
        None => {
            info!(
                grace_seconds = settings.server.graceful_shutdown.as_secs(),
                "shutdown signal received, draining connections"
            );
            let _ = shutdown_tx.send(());
            match tokio::time::timeout(settings.server.graceful_shutdown, &mut server).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("graceful shutdown timed out, aborting open connections");
                    server.abort();
                    Ok(Ok(()))
                }
            }
        }
    };

    if let Some(handle) = reload_handle {
        handle.abort();
    }

    result
        .map_err(|err| AppError::unexpected(format!("server task failed: {err}")))?
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))
}

async fn run_generate(settings: config::Settings, args: GenerateArgs) -> Result<(), AppError> {
    let (source, _) = open_catalog(&settings.catalog).await?;

    let service = SitemapService::new(
        SitemapConfig::from(&settings.sitemap),
        source,
        Arc::new(TemplateRenderer),
        None,
    );
    let request = SitemapRequest {
        index: args.index,
        is_anonymous: false,
    };
    let body = service.handle(&request).await?;

    match args.output {
        Some(path) => {
            tokio::fs::write(&path, &body)
                .await
                .map_err(|err| AppError::from(InfraError::from(err)))?;
            info!(
                path = %path.display(),
                bytes = body.len(),
                index = ?args.index,
                "sitemap written"
            );
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(&body)
                .and_then(|()| stdout.flush())
                .map_err(|err| AppError::from(InfraError::from(err)))?;
        }
    }

    Ok(())
}

async fn open_catalog(
    settings: &config::CatalogSettings,
) -> Result<(Arc<dyn ContentSource>, Option<Arc<FileCatalog>>), AppError> {
    match settings.path.as_ref() {
        Some(path) => {
            let catalog = Arc::new(FileCatalog::open(path.clone()).await?);
            let source: Arc<dyn ContentSource> = catalog.clone();
            Ok((source, Some(catalog)))
        }
        None => {
            warn!(
                target = "sitemapper::catalog",
                "no catalog path configured; serving an empty catalog"
            );
            let source: Arc<dyn ContentSource> = Arc::new(InMemoryCatalog::default());
            Ok((source, None))
        }
    }
}

fn spawn_catalog_reload(catalog: Arc<FileCatalog>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await; // Skip the first immediate tick
        loop {
            interval.tick().await;
            if let Err(err) = catalog.refresh().await {
                warn!(
                    target = "sitemapper::catalog",
                    path = %catalog.path().display(),
                    error = %err,
                    "catalog reload failed; keeping previous snapshot"
                );
            }
        }
    })
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
