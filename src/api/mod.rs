//! REST API endpoints.
//!
//! Axum-based HTTP API exposing the rankings, meta reports and deck
//! rating over the configured row source.

pub mod routes;
pub mod state;

use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::analysis::AnalysisError;
use crate::models::Region;
use crate::storage::RowFilter;

use state::AppState;

/// API error types.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        if status.is_server_error() {
            tracing::error!("{}", self);
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::InvalidDeck(_) => ApiError::BadRequest(err.to_string()),
            AnalysisError::Storage(e) => ApiError::Internal(e.to_string()),
        }
    }
}

/// Build the row filter from an optional `region` query value.
pub fn row_filter(region: Option<&str>) -> Result<RowFilter, ApiError> {
    match region.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(RowFilter::all()),
        Some(code) => code
            .parse::<Region>()
            .map(|r| RowFilter::all().with_region(r))
            .map_err(ApiError::BadRequest),
    }
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origin == "*" {
        return layer.allow_origin(Any);
    }
    match HeaderValue::from_str(origin) {
        Ok(value) => layer.allow_origin(value),
        Err(_) => {
            tracing::warn!("Invalid CORS origin {:?}, allowing any", origin);
            layer.allow_origin(Any)
        }
    }
}

/// Build the API router.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origin);

    Router::new()
        .route("/api/health", get(routes::health))
        .route("/api/summary", get(routes::meta::summary))
        .route("/api/rankings/blades", get(routes::rankings::blades))
        .route("/api/rankings/combos", get(routes::rankings::combos))
        .route("/api/rankings/parts/:kind", get(routes::rankings::parts))
        .route("/api/blades/:name/combos", get(routes::rankings::blade_combos))
        .route("/api/compare/blades", get(routes::analysis::compare_blades))
        .route("/api/compare/combos", get(routes::analysis::compare_combos))
        .route("/api/meta/snapshot", get(routes::meta::snapshot))
        .route("/api/meta/spotlight", get(routes::meta::spotlight))
        .route("/api/meta/distribution", get(routes::meta::distribution))
        .route("/api/meta/share", get(routes::meta::share_over_time))
        .route("/api/meta/evolution", get(routes::meta::evolution))
        .route("/api/sparkline", get(routes::analysis::sparkline))
        .route("/api/gems", get(routes::analysis::hidden_gems))
        .route("/api/deck/rate", post(routes::analysis::rate_deck))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
