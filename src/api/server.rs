//! Router assembly and server startup.

use super::middleware::require_auth;
use super::routes::{dividends, health, history, tasks, token};
use super::state::AppState;
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the HTTP router
///
/// `/health` and `/token` are public. Everything under `/api/v1` requires a
/// bearer credential.
pub fn build_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/api/v1/tao_dividends", get(dividends::get_tao_dividends))
        .route("/api/v1/tasks/:task_id", get(tasks::get_task))
        .route("/api/v1/dividend_history", get(history::get_history))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/token", post(token::issue_token))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

// ============================================================================
// SERVER STARTUP
// ============================================================================

pub async fn run_server(state: Arc<AppState>, host: &str, port: u16) -> anyhow::Result<()> {
    let network = state.config.chain.network.clone();
    let history = if state.history.is_some() {
        "enabled"
    } else {
        "disabled"
    };
    let app = build_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("╔══════════════════════════════════════════════════════════════╗");
    info!("║                   Tao Dividends API Server                   ║");
    info!("╠══════════════════════════════════════════════════════════════╣");
    info!("║  Network:      {:45} ║", network);
    info!("║  History:      {:45} ║", history);
    info!("║  Listening on: {:45} ║", addr);
    info!("╠══════════════════════════════════════════════════════════════╣");
    info!("║  Endpoints:                                                  ║");
    info!("║    GET  /health                   - Health check             ║");
    info!("║    POST /token                    - Issue access token       ║");
    info!("║    GET  /api/v1/tao_dividends     - Dividend lookup / trade  ║");
    info!("║    GET  /api/v1/tasks/:task_id    - Stake job status         ║");
    info!("║    GET  /api/v1/dividend_history  - Recent history records   ║");
    info!("╚══════════════════════════════════════════════════════════════╝");

    axum::serve(listener, app).await?;

    Ok(())
}
