use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api;
use crate::finder::FinderService;

/// Full application router with the API mounted under `/api`
pub fn app(finder: Arc<FinderService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", api::router(finder))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

pub async fn run(port: u16, finder: Arc<FinderService>) -> Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Web server running at http://localhost:{}", port);
    axum::serve(listener, app(finder))
        .await
        .context("Web server stopped unexpectedly")
}
