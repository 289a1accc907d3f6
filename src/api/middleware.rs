//! Bearer authentication middleware.

use super::errors::ApiError;
use super::state::AppState;
use crate::crypto::auth::AuthError;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

/// Resolve the bearer credential and attach the `Principal` to the request
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers()).ok_or(AuthError::MissingToken)?;
    let principal = state.auth.authenticate(token).map_err(|e| {
        debug!("Rejected request to {}: {}", req.uri().path(), e);
        e
    })?;
    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

/// Credential from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
