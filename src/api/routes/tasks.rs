//! `GET /api/v1/tasks/{task_id}`

use crate::api::errors::ApiError;
use crate::api::state::AppState;
use crate::worker::JobRecord;
use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Json<JobRecord>, ApiError> {
    state
        .queue
        .get_record(&task_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Task {} not found", task_id)))
}
