use axum::extract::multipart::MultipartError;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::app_state::AppState;
use crate::db::StoreError;
use crate::services::csv_ingest::CsvError;

pub mod health;
pub mod requests;

/// Allowance for multipart boundaries and part headers around the CSV.
pub const MULTIPART_ENVELOPE_BYTES: usize = 64 * 1024;

/// Whole-body limit for an upload whose file part may be `max_upload_bytes`.
pub fn body_limit(max_upload_bytes: usize) -> usize {
    max_upload_bytes.saturating_add(MULTIPART_ENVELOPE_BYTES)
}

/// API routes with their shared state. Layers are added by the caller.
pub fn api_router(state: AppState) -> Router {
    let limit = body_limit(state.max_upload_bytes);
    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/upload", post(requests::upload_csv))
        .route("/api/status/{request_id}", get(requests::get_status))
        .layer(DefaultBodyLimit::max(limit))
        .with_state(state)
}

/// Errors surfaced to HTTP callers as `{"error": ...}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No file uploaded.")]
    MissingFile,

    #[error("Request ID not found.")]
    NotFound,

    #[error("File too large.")]
    FileTooLarge,

    #[error("Invalid multipart body: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Malformed CSV: {0}")]
    Csv(#[from] CsvError),

    #[error("Failed to store upload: {0}")]
    Io(#[from] std::io::Error),

    #[error("Request store error: {0}")]
    Store(#[from] StoreError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingFile | ApiError::Csv(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::FileTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Multipart(e) => e.status(),
            ApiError::Io(_) | ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
