use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::PantryFinderError;
use crate::finder::{FinderService, QueryOutcome};
use crate::resolver::Strategy;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub address: Option<String>,
    pub strategy: Option<String>,
}

/// Error body returned by every failing endpoint
pub struct ApiError(PantryFinderError);

impl From<PantryFinderError> for ApiError {
    fn from(error: PantryFinderError) -> Self {
        Self(error)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            PantryFinderError::UnresolvedAddress { .. }
            | PantryFinderError::UnmatchedLocation { .. } => StatusCode::NOT_FOUND,
            PantryFinderError::Validation { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!("Search failed with {}: {}", status, self.0);
        (status, Json(json!({ "error": self.0.user_message() }))).into_response()
    }
}

pub fn router(finder: Arc<FinderService>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/search", get(search))
        .with_state(finder)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn search(
    State(finder): State<Arc<FinderService>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<QueryOutcome>, ApiError> {
    let strategy = params
        .strategy
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::parse::<Strategy>)
        .transpose()?;

    let address = params
        .address
        .ok_or_else(|| PantryFinderError::validation("Missing 'address' query parameter"))?;

    let outcome = finder.search(&address, strategy).await?;
    Ok(Json(outcome))
}
