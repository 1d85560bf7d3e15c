//! HTTP Surface
//!
//! Router assembly and server startup. Per-tool usage endpoints accept GET
//! only (anything else gets a 405 with `Allow: GET`); invocation endpoints
//! accept POST only.

pub mod cookies;
pub mod handlers;
pub mod identity;
pub mod state;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::metrics;
use state::AppState;

/// Build the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .route("/api/tools/{tool}/usage", get(handlers::usage_handler))
        .route("/api/tools/{tool}/invoke", post(handlers::invoke_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server
pub async fn serve(state: AppState) -> Result<()> {
    metrics::init().context("Failed to initialize metrics")?;

    let addr: SocketAddr = format!(
        "{}:{}",
        state.config.server.bind, state.config.server.port
    )
    .parse()
    .context("Invalid bind address")?;

    let app = router(state);

    info!("Starting usage gateway on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind server address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
