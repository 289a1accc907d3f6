//! `POST /token`: exchange a static API token for a signed access token.

use crate::api::errors::ApiError;
use crate::api::middleware::bearer_token;
use crate::api::state::AppState;
use crate::crypto::auth::{AuthError, TokenResponse};
use axum::{extract::State, http::HeaderMap, Json};
use std::sync::Arc;
use tracing::info;

pub async fn issue_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, ApiError> {
    let static_token = bearer_token(&headers).ok_or(AuthError::MissingToken)?;
    let token = state.auth.issue_token(static_token)?;
    info!("Issued access token (expires in {}s)", token.expires_in);
    Ok(Json(token))
}
