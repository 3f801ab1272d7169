use crate::config::Config;
use crate::resolver::{SearchProvider, VideoResolver};
use crate::streaming::{self, StreamProxy};
use crate::upstream::MediaFetcher;
use anyhow::{Context, Result};
use axum::{
    handler::HandlerWithoutStateExt,
    http::{header, Method},
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tubeproxy_common::Error;

pub mod error;
pub mod routes_api;

use error::AppError;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    /// Metadata resolver (also behind `stream_proxy`)
    pub resolver: Arc<dyn VideoResolver>,
    pub search: Arc<dyn SearchProvider>,
    pub stream_proxy: StreamProxy,
}

impl AppContext {
    pub fn new(
        config: Config,
        resolver: Arc<dyn VideoResolver>,
        fetcher: Arc<dyn MediaFetcher>,
        search: Arc<dyn SearchProvider>,
    ) -> Self {
        let stream_proxy = StreamProxy::new(resolver.clone(), fetcher, &config.upstream);
        Self {
            config: Arc::new(config),
            resolver,
            search,
            stream_proxy,
        }
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext, static_dir: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::RANGE])
        .expose_headers([
            header::CONTENT_RANGE,
            header::CONTENT_LENGTH,
            header::ACCEPT_RANGES,
        ]);

    // Compress JSON only; a compressed /stream body would contradict its
    // Content-Length and Content-Range.
    let api = routes_api::api_routes().layer(CompressionLayer::new());

    let mut app = Router::new()
        .merge(api)
        .merge(streaming::stream_router());

    // Serve the frontend if a build is available, JSON 404 for anything else
    app = match static_dir {
        Some(dir) if dir.exists() => {
            tracing::info!("Serving static files from {:?}", dir);
            app.fallback_service(ServeDir::new(&dir).not_found_service(not_found.into_service()))
        }
        _ => app.fallback(not_found),
    };

    app.layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

async fn not_found() -> AppError {
    AppError::new(Error::not_found("Resource not found"))
}

/// Start the HTTP server
pub async fn start_server(config: Config, ctx: AppContext) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let app = create_router(ctx, config.server.static_dir.clone());

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
