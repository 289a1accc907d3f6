//! `GET /api/v1/tao_dividends`

use crate::api::errors::ApiError;
use crate::api::state::AppState;
use crate::crypto::auth::{AuthError, Principal, Scope};
use crate::dividends::DividendSource;
use crate::storage::NewDividendHistory;
use crate::worker::enqueue_stake_job;
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

#[derive(Debug, Default, Deserialize)]
pub struct DividendParams {
    pub netuid: Option<String>,
    pub hotkey: Option<String>,
    pub trade: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DividendResponse {
    pub netuid: String,
    pub hotkey: String,
    pub dividend_value: f64,
    /// Unix seconds
    pub timestamp: f64,
    pub trade_triggered: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub status: String,
}

pub async fn get_tao_dividends(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Query(params): Query<DividendParams>,
) -> Result<Json<DividendResponse>, ApiError> {
    let started = Instant::now();

    let netuid = match params.netuid.as_deref().map(str::trim) {
        None | Some("") => state.config.chain.default_netuid,
        Some(raw) => raw
            .parse::<u16>()
            .map_err(|_| ApiError::BadRequest(format!("Invalid netuid: {}", raw)))?,
    };
    let hotkey = match params.hotkey.as_deref().map(str::trim) {
        None | Some("") => state.config.chain.default_hotkey.clone(),
        Some(raw) => raw.to_string(),
    };
    let trade = match params.trade.as_deref() {
        None => false,
        Some(raw) => parse_flag(raw)
            .ok_or_else(|| ApiError::BadRequest(format!("Invalid trade flag: {}", raw)))?,
    };

    if trade {
        principal.require(Scope::Stake).map_err(|e: AuthError| {
            warn!("{} may not trigger trades: {}", principal.username, e);
            e
        })?;
    }

    info!(
        user = %principal.username,
        netuid,
        hotkey = %hotkey,
        trade,
        "Dividend request"
    );

    let query = state.dividends.get_tao_dividends(netuid, &hotkey).await;

    if let Some(history) = &state.history {
        if let Err(e) = history
            .append(NewDividendHistory::from_query(&query))
            .await
        {
            warn!("Failed to record dividend history: {}", e);
        }
    }

    let mut response = DividendResponse {
        netuid: netuid.to_string(),
        hotkey: hotkey.clone(),
        dividend_value: query.dividend,
        timestamp: query.timestamp.timestamp_millis() as f64 / 1000.0,
        trade_triggered: false,
        message: "No stake triggered.".to_string(),
        task_id: None,
        status: match query.source {
            DividendSource::Simulated => "simulated",
            DividendSource::Cache | DividendSource::Chain => "success",
        }
        .to_string(),
    };

    if trade {
        match enqueue_stake_job(state.queue.as_ref(), netuid, &hotkey, &state.config.queue).await {
            Ok(job) => {
                response.trade_triggered = true;
                response.task_id = Some(job.id);
                response.message = "Stake operation triggered in background.".to_string();
            }
            Err(e) => {
                error!("Failed to trigger stake operation: {}", e);
                response.message = format!("Failed to trigger stake operation: {}", e);
                response.status = "partial_success".to_string();
            }
        }
    }

    info!(
        "Processed dividend request in {:.4}s ({:?})",
        started.elapsed().as_secs_f64(),
        query.source
    );
    Ok(Json(response))
}

/// Boolean query flag in the forms clients commonly send
fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
