//! API endpoints for questionnaire records.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};

use crate::store::{now_string, QuestionnaireRecord};

use super::routes::AppState;

/// Create the questionnaire API routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list).delete(clear))
        .route("/:task_id", get(get_one).put(upsert))
}

/// PUT body: everything except the key and the server-side stamps. The
/// answer fields arrive flattened, exactly as the form serializes them.
#[derive(Debug, Deserialize)]
pub struct SaveQuestionnaireRequest {
    #[serde(default)]
    pub part: u32,
    #[serde(default)]
    pub task_type: Option<String>,
    #[serde(default)]
    pub task_level: Option<String>,
    #[serde(default)]
    pub task_risk_label: Option<String>,
    #[serde(default)]
    pub task_path: Option<String>,
    #[serde(flatten)]
    pub answers: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub count: usize,
    pub records: Vec<QuestionnaireRecord>,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub cleared: bool,
}

fn store_error(e: String) -> (StatusCode, String) {
    tracing::warn!("Questionnaire store error: {}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, e)
}

/// GET /api/questionnaires
/// All locally saved records.
async fn list(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListResponse>, (StatusCode, String)> {
    let records = state.store.list_records().await.map_err(store_error)?;
    Ok(Json(ListResponse {
        count: records.len(),
        records,
    }))
}

/// GET /api/questionnaires/{task_id}
/// A single record, or 404.
async fn get_one(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Json<QuestionnaireRecord>, (StatusCode, String)> {
    let record = state
        .store
        .get_record(&task_id)
        .await
        .map_err(store_error)?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                format!("no questionnaire saved for task {}", task_id),
            )
        })?;
    Ok(Json(record))
}

/// PUT /api/questionnaires/{task_id}
/// Insert or replace the record for a task. Replacing resets the upload
/// stamp: an edited questionnaire counts as not-yet-uploaded again.
async fn upsert(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
    Json(req): Json<SaveQuestionnaireRequest>,
) -> Result<Json<QuestionnaireRecord>, (StatusCode, String)> {
    let record = QuestionnaireRecord {
        task_id,
        part: req.part,
        task_type: req.task_type,
        task_level: req.task_level,
        task_risk_label: req.task_risk_label,
        task_path: req.task_path,
        saved_at: now_string(),
        uploaded_at: None,
        upload_response: None,
        answers: req.answers,
    };

    state
        .store
        .upsert_record(&record)
        .await
        .map_err(store_error)?;
    Ok(Json(record))
}

/// DELETE /api/questionnaires
/// Drop every locally saved record.
async fn clear(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ClearResponse>, (StatusCode, String)> {
    state.store.clear_records().await.map_err(store_error)?;
    Ok(Json(ClearResponse { cleared: true }))
}
