//! `GET /api/v1/dividend_history`

use crate::api::errors::ApiError;
use crate::api::state::AppState;
use crate::storage::{DividendHistory, HistoryFilter};
use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub count: usize,
    pub records: Vec<DividendHistory>,
}

pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<HistoryFilter>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let history = state
        .history
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("Dividend history is not enabled".to_string()))?;

    let records = history.recent(&filter).await?;
    Ok(Json(HistoryResponse {
        count: records.len(),
        records,
    }))
}
