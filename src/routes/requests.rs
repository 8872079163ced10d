use axum::extract::{Multipart, Path, State};
use axum::Json;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::api::{StatusResponse, UploadResponse};
use crate::models::request::RequestStatus;
use crate::routes::ApiError;
use crate::services::csv_ingest;

/// POST /api/upload: accept a product CSV and start compressing its images.
///
/// Responds as soon as the request is stored; the pipeline runs in the background.
pub async fn upload_csv(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut csv_data = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            tracing::info!(file_name = ?field.file_name(), "Received CSV upload");
            let bytes = field.bytes().await?;
            if bytes.len() > state.max_upload_bytes {
                tracing::warn!(
                    size = bytes.len(),
                    limit = state.max_upload_bytes,
                    "CSV upload too large"
                );
                return Err(ApiError::FileTooLarge);
            }
            csv_data = Some(bytes);
        }
    }

    let csv_data = csv_data.ok_or(ApiError::MissingFile)?;
    let products = csv_ingest::parse_products(csv_data.as_ref())?;

    let request_id = Uuid::new_v4().to_string();
    let csv_path = state.upload_dir.join(format!("{request_id}.csv"));
    tokio::fs::create_dir_all(state.upload_dir.as_path()).await?;
    tokio::fs::write(&csv_path, &csv_data).await?;

    let request = state
        .store
        .create(&request_id, products, RequestStatus::Processing)
        .await?;

    metrics::counter!("upload_requests_total").increment(1);
    tracing::info!(
        request_id = %request_id,
        products = request.products.len(),
        "Request created, scheduling pipeline"
    );

    state.pipeline.spawn(request_id.clone(), csv_path);

    Ok(Json(UploadResponse { request_id }))
}

/// GET /api/status/{request_id}: current status and products of a request.
pub async fn get_status(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let request = state
        .store
        .find_by_id(&request_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(request.into()))
}
