//! API endpoints for uploading questionnaires to the configured repository.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};

use crate::upload::{self, UploadError, UploadReceipt, UploadStatus};

use super::routes::AppState;

/// Create the upload API routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(upload_all))
        .route("/status", get(status))
}

/// POST /api/upload
/// Bundle every saved questionnaire and push it to the upload target.
async fn upload_all(
    State(state): State<Arc<AppState>>,
) -> Result<Json<UploadReceipt>, (StatusCode, String)> {
    let uploader = state.uploader.as_ref().ok_or((
        StatusCode::SERVICE_UNAVAILABLE,
        "uploads are not configured (set GITHUB_TOKEN)".to_string(),
    ))?;

    let receipt = uploader
        .upload_all(state.store.as_ref())
        .await
        .map_err(|e| match e {
            UploadError::NoRecords => (StatusCode::BAD_REQUEST, e.to_string()),
            UploadError::Api { .. } | UploadError::Http(_) => {
                tracing::warn!("Upload failed: {}", e);
                (StatusCode::BAD_GATEWAY, e.to_string())
            }
            UploadError::Serialize(_) | UploadError::Store(_) => {
                tracing::warn!("Upload failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        })?;

    Ok(Json(receipt))
}

/// GET /api/upload/status
/// Local bookkeeping: how many records exist and how many are uploaded.
async fn status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<UploadStatus>, (StatusCode, String)> {
    let status = upload::upload_status(state.store.as_ref())
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e))?;
    Ok(Json(status))
}
