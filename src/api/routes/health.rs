//! `GET /health`

use crate::api::state::AppState;
use crate::util::timestamp::now_secs_f64;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub bittensor_client: String,
    pub auth: String,
    pub timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let initialized = state.chain.is_initialized();
    Json(HealthResponse {
        status: if initialized { "healthy" } else { "degraded" }.to_string(),
        bittensor_client: if initialized {
            "initialized"
        } else {
            "not_initialized"
        }
        .to_string(),
        auth: if state.auth.jwt_configured() {
            "jwt"
        } else {
            "legacy"
        }
        .to_string(),
        timestamp: now_secs_f64(),
        error: state.chain.initialization_error(),
    })
}
