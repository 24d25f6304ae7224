mod costs;
mod refine;
mod transactions;

use crate::AppState;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use kontera_import::IngestError;
use kontera_refine::RefineError;
use kontera_storage::StorageError;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/costs", get(costs::list))
        .route("/costs/upload", post(costs::upload))
        .route("/transactions", get(transactions::list))
        .route("/refine/promote", post(refine::run_promote))
        .route("/refine/enrich", post(refine::run_enrich))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Error shape shared by all routes: a status code plus a human-readable
/// detail string in the body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        ApiError { status: StatusCode::BAD_REQUEST, detail: detail.into() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "detail": self.detail }))).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        ApiError { status: StatusCode::INTERNAL_SERVER_ERROR, detail: e.to_string() }
    }
}

impl From<IngestError> for ApiError {
    fn from(e: IngestError) -> Self {
        let status = match &e {
            IngestError::NoRecords { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            IngestError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError { status, detail: e.to_string() }
    }
}

impl From<RefineError> for ApiError {
    fn from(e: RefineError) -> Self {
        let status = match &e {
            RefineError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RefineError::Completion(_) | RefineError::MappingParse(_) => StatusCode::BAD_GATEWAY,
        };
        ApiError { status, detail: e.to_string() }
    }
}
