//! API endpoints for the segmentation of the catalog into reviewer parts.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;

use crate::catalog::Task;
use crate::segment::service::SegmentServiceError;
use crate::segment::PartitionResult;

use super::routes::AppState;

/// Create the segmentation API routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(current))
        .route("/recompute", post(recompute))
        .route("/parts/:part", get(part))
}

#[derive(Debug, Serialize)]
pub struct PartResponse {
    /// 1-based part number, as shown to reviewers.
    pub part: usize,
    pub count: usize,
    pub tasks: Vec<Task>,
}

fn map_segment_error(e: SegmentServiceError) -> (StatusCode, String) {
    match e {
        SegmentServiceError::Invalid(err) => (StatusCode::BAD_REQUEST, err.to_string()),
        SegmentServiceError::Store(err) => {
            tracing::warn!("Failed to persist segmentation: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, err)
        }
    }
}

/// GET /api/segmentation
/// Derive the current segmentation and persist it.
async fn current(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PartitionResult>, (StatusCode, String)> {
    let result = state
        .segmenter
        .ensure(&state.manifest.tasks, state.store.as_ref())
        .await
        .map_err(map_segment_error)?;
    Ok(Json(result))
}

/// POST /api/segmentation/recompute
/// Force a fresh segmentation and persist it.
async fn recompute(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PartitionResult>, (StatusCode, String)> {
    let result = state
        .segmenter
        .recompute(&state.manifest.tasks, state.store.as_ref())
        .await
        .map_err(map_segment_error)?;
    Ok(Json(result))
}

/// GET /api/segmentation/parts/{part}
/// The task list of one part, addressed by 1-based part number.
async fn part(
    State(state): State<Arc<AppState>>,
    Path(part_number): Path<usize>,
) -> Result<Json<PartResponse>, (StatusCode, String)> {
    let result = state
        .segmenter
        .ensure(&state.manifest.tasks, state.store.as_ref())
        .await
        .map_err(map_segment_error)?;

    let tasks = result
        .part(part_number)
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                format!(
                    "part {} does not exist (1..={})",
                    part_number,
                    result.parts.len()
                ),
            )
        })?
        .to_vec();

    Ok(Json(PartResponse {
        part: part_number,
        count: tasks.len(),
        tasks,
    }))
}
