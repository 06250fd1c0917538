// HTTP routes

mod http;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing::get};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::error::MetricsError;
use crate::query::QueryEngine;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) engine: Arc<QueryEngine>,
}

pub fn app(engine: Arc<QueryEngine>) -> Router {
    let state = AppState { engine };
    Router::new()
        .route("/", get(http::all_time_averages)) // GET /
        .route("/limit/{token}", get(http::windowed_averages)) // GET /limit/{token}
        .route("/version", get(http::version_handler)) // GET /version
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}

/// Domain errors mapped onto HTTP statuses: malformed client input is 422,
/// everything else a 500 with the detail kept out of the response body.
pub(crate) struct ApiError(MetricsError);

impl From<MetricsError> for ApiError {
    fn from(e: MetricsError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self.0 {
            MetricsError::InvalidWindowFormat(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.0.to_string())
            }
            MetricsError::Storage(e) => {
                tracing::error!(error = %e, "query failed against the sample store");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database error occurred".to_string(),
                )
            }
            other => {
                tracing::error!(error = %other, "query failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        };
        (status, Json(serde_json::json!({ "detail": detail }))).into_response()
    }
}
