use std::{pin::pin, process, sync::Arc};

use folio::{
    application::{
        content::PostsOrigin, content_cache::ContentCache, error::AppError, posts::PostService,
        render::render_service,
    },
    cache::{CacheConfig, RedisTier, RemoteTier, TieredCache},
    config,
    infra::{
        content::build_source,
        error::InfraError,
        http::{self, HttpState},
        origin::HttpOrigin,
        telemetry,
    },
};
use tokio::{signal, sync::oneshot};
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

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
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
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let state = build_http_state(&settings)?;
    serve_http(&settings, state).await
}

fn build_http_state(settings: &config::Settings) -> Result<HttpState, AppError> {
    let client = reqwest::Client::builder()
        .build()
        .map_err(|err| InfraError::configuration(format!("failed to build http client: {err}")))?;

    let remote = settings.cache.redis_url.as_ref().map(|url| {
        Arc::new(RedisTier::new(Some(url.clone()))) as Arc<dyn RemoteTier>
    });
    let cache_config = CacheConfig::from(settings);
    info!(
        target = "folio::bootstrap",
        cache_enabled = cache_config.enabled,
        memory_capacity = cache_config.memory_capacity,
        remote_tier = remote.is_some(),
        "Configured content cache"
    );
    let cache = TieredCache::new(cache_config, remote);

    let origin: Arc<dyn PostsOrigin> = Arc::new(HttpOrigin::new(
        client.clone(),
        settings.server.public_url.clone(),
    ));
    let content = Arc::new(ContentCache::new(cache, origin));

    let source = build_source(settings, client)?;
    let posts = Arc::new(PostService::new(
        source,
        Arc::clone(&content),
        render_service(),
    ));

    if settings.cache.purge_secret.is_none() {
        warn!(
            target = "folio::bootstrap",
            "No purge secret configured; /cache/purge will reject every request"
        );
    }

    Ok(HttpState {
        posts,
        content,
        purge_secret: settings.cache.purge_secret.clone(),
        site_url: settings.server.public_url.clone(),
    })
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "folio::bootstrap",
        addr = %settings.server.addr,
        public_url = %settings.server.public_url,
        "Listening"
    );

    let grace = settings.server.graceful_shutdown;
    let (signalled_tx, signalled_rx) = oneshot::channel::<()>();
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = signalled_tx.send(());
        })
        .into_future();
    let mut server = pin!(server);

    // In-flight requests get `grace` to drain once a signal arrives.
    let drain_deadline = async move {
        if signalled_rx.await.is_err() {
            std::future::pending::<()>().await;
        }
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        result = &mut server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        _ = drain_deadline => {
            warn!(target = "folio::bootstrap", ?grace, "Graceful shutdown timed out");
        }
    }

    info!(target = "folio::bootstrap", "Server shutdown complete");
    Ok(())
}

/// Waits for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(target = "folio::bootstrap", error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(target = "folio::bootstrap", error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!(target = "folio::bootstrap", "Received Ctrl+C, shutting down"),
        _ = terminate => info!(target = "folio::bootstrap", "Received SIGTERM, shutting down"),
    }
}
