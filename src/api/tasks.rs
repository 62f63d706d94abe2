//! API endpoints for the task catalog.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{extract::State, response::Json, routing::get, Router};
use serde::Serialize;

use crate::catalog::Task;
use crate::segment::totals_by_key;

use super::routes::AppState;

/// Create the task API routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_tasks))
        .route("/stats", get(task_stats))
}

#[derive(Debug, Serialize)]
pub struct TasksResponse {
    pub generated_at: String,
    pub task_count: usize,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Serialize)]
pub struct TaskStatsResponse {
    pub total: usize,
    /// Task count per grouping key.
    pub totals: BTreeMap<String, usize>,
}

/// GET /api/tasks
/// The full task manifest.
async fn list_tasks(State(state): State<Arc<AppState>>) -> Json<TasksResponse> {
    Json(TasksResponse {
        generated_at: state.manifest.generated_at.clone(),
        task_count: state.manifest.len(),
        tasks: state.manifest.tasks.clone(),
    })
}

/// GET /api/tasks/stats
/// Distribution of tasks across grouping keys.
async fn task_stats(State(state): State<Arc<AppState>>) -> Json<TaskStatsResponse> {
    Json(TaskStatsResponse {
        total: state.manifest.tasks.len(),
        totals: totals_by_key(&state.manifest.tasks),
    })
}
