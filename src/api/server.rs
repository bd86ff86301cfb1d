use std::any::Any;
use std::net::SocketAddr;

use axum::{
    Router, middleware,
    response::{IntoResponse, Response},
    routing::{any, get},
};
use tokio::net::TcpListener;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::{error, info};

use super::{
    cors,
    error::ApiError,
    services::{download, generate, health},
    state::AppState,
};
use crate::config::Config;
use crate::ratelimit::spawn_sweeper;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Routes of the gateway.
///
/// The two API endpoints accept any method and decide themselves how to answer,
/// so preflight and 405 responses carry the same CORS headers as everything else.
/// A panicking handler becomes a JSON 500, still with CORS headers.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/generate",
            any(generate)
                .layer(CatchPanicLayer::custom(panic_response))
                .layer(middleware::map_response(cors::generate_headers)),
        )
        .route(
            "/api/download",
            any(download)
                .layer(CatchPanicLayer::custom(panic_response))
                .layer(middleware::map_response(cors::download_headers)),
        )
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("non-string panic payload");
    error!(panic = detail, "Request handler panicked");

    ApiError::Internal("unexpected failure while handling the request".to_string())
        .into_response()
}

pub async fn run(config: Config) -> Result<(), AnyError> {
    let address = config.server.bind_addr;

    info!(
        limit = config.rate_limit.daily_limit,
        window_secs = config.rate_limit.window_secs,
        upstream = %config.upstream.generate_url,
        max_body = %config.server.max_body_bytes,
        "Configuration loaded"
    );

    let sweep_interval = config.rate_limit.sweep_interval();
    let state = AppState::new(config)
        .map_err(|e| format!("Failed to build upstream client: {}", e))?;

    let sweeper = spawn_sweeper(state.limiter.clone(), sweep_interval);

    let app = router(state);
    let listener = TcpListener::bind(address).await?;
    info!(%address, "FakeML gateway listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    sweeper.abort();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received");
}
