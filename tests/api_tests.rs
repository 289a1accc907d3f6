//! REST API integration tests
//!
//! Drive the router with in-memory cache, queue and history backends and a
//! fixed-value chain client.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use futures::FutureExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tao_dividends::*;
use tower::ServiceExt;

// ============================================================================
// FIXTURES
// ============================================================================

const TOKEN: &str = "datura";
const HOTKEY: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";

struct FixedChain {
    rao: u64,
}

#[async_trait]
impl ChainClient for FixedChain {
    async fn tao_dividends(&self, _netuid: u16, _hotkey: &str) -> Result<u64, ChainError> {
        Ok(self.rao)
    }

    async fn add_stake(&self, _: &str, _: u16, _: u64) -> Result<String, ChainError> {
        Ok("0xabc".to_string())
    }

    async fn remove_stake(&self, _: &str, _: u16, _: u64) -> Result<String, ChainError> {
        Ok("0xdef".to_string())
    }
}

/// Queue whose writes always fail
struct BrokenQueue;

fn broken() -> QueueError {
    QueueError::Serialization(serde_json::from_str::<Value>("{").unwrap_err())
}

#[async_trait]
impl JobQueue for BrokenQueue {
    async fn enqueue(&self, _: &StakeJob) -> Result<(), QueueError> {
        Err(broken())
    }
    async fn schedule_retry(&self, _: &StakeJob, _: Duration) -> Result<(), QueueError> {
        Err(broken())
    }
    async fn promote_due(&self) -> Result<usize, QueueError> {
        Ok(0)
    }
    async fn dequeue(&self, _: Duration) -> Result<Option<StakeJob>, QueueError> {
        Ok(None)
    }
    async fn put_record(&self, _: &JobRecord) -> Result<(), QueueError> {
        Err(broken())
    }
    async fn get_record(&self, _: &str) -> Result<Option<JobRecord>, QueueError> {
        Ok(None)
    }
}

struct Fixture {
    state: Arc<AppState>,
    cache: Arc<MemoryCache>,
    queue: Arc<MemoryJobQueue>,
    history: Arc<MemoryHistoryStore>,
}

impl Fixture {
    fn new() -> Self {
        Self::with_chain(Arc::new(ChainConnection::with_client(Arc::new(FixedChain {
            rao: 1_500_000_000,
        }))))
    }

    /// Fixture whose token authority signs JWTs with a configured secret
    fn with_jwt() -> Self {
        let mut config = ServiceConfig::default();
        config.auth.jwt_secret = "test-secret".to_string();
        config.auth.jwt_secret_configured = true;
        Self::build(config, Arc::new(ChainConnection::with_client(Arc::new(FixedChain {
            rao: 1_500_000_000,
        }))))
    }

    fn with_chain(chain: Arc<ChainConnection>) -> Self {
        Self::build(ServiceConfig::default(), chain)
    }

    fn build(config: ServiceConfig, chain: Arc<ChainConnection>) -> Self {
        let cache = Arc::new(MemoryCache::new());
        let queue = Arc::new(MemoryJobQueue::new());
        let history = Arc::new(MemoryHistoryStore::new());
        let state = Arc::new(AppState::new(
            config,
            cache.clone(),
            chain,
            queue.clone(),
            Some(history.clone() as Arc<dyn HistoryStore>),
        ));
        Self {
            state,
            cache,
            queue,
            history,
        }
    }

    fn app(&self) -> Router {
        build_router(Arc::clone(&self.state))
    }
}

fn degraded_chain() -> Arc<ChainConnection> {
    let connector: Connector = Arc::new(|| {
        async {
            Err::<Arc<dyn ChainClient>, _>(ChainError::Unavailable("node down".to_string()))
        }
        .boxed()
    });
    Arc::new(ChainConnection::with_connector(connector, 1, Duration::ZERO))
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

fn post(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

// ============================================================================
// DIVIDENDS
// ============================================================================

#[tokio::test]
async fn test_dividends_with_defaults() {
    let fx = Fixture::new();
    let (status, body) = send(fx.app(), get("/api/v1/tao_dividends", Some(TOKEN))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["netuid"], "18");
    assert_eq!(body["hotkey"], DEFAULT_HOTKEY);
    assert_eq!(body["dividend_value"], 1.5);
    assert_eq!(body["trade_triggered"], false);
    assert_eq!(body["message"], "No stake triggered.");
    assert_eq!(body["status"], "success");
    assert!(body.get("task_id").is_none());
    assert!(body["timestamp"].as_f64().unwrap() > 1_600_000_000.0);

    assert_eq!(fx.history.len(), 1);
    assert_eq!(fx.cache.len(), 1);
}

#[tokio::test]
async fn test_dividends_served_from_cache() {
    let fx = Fixture::new();
    fx.cache
        .set(&dividend_cache_key(7, HOTKEY), "0.25", Duration::from_secs(60))
        .await
        .unwrap();

    let uri = format!("/api/v1/tao_dividends?netuid=7&hotkey={}", HOTKEY);
    let (status, body) = send(fx.app(), get(&uri, Some(TOKEN))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["netuid"], "7");
    assert_eq!(body["hotkey"], HOTKEY);
    assert_eq!(body["dividend_value"], 0.25);
}

#[tokio::test]
async fn test_dividends_simulated_when_chain_down() {
    let fx = Fixture::with_chain(degraded_chain());
    let (status, body) = send(fx.app(), get("/api/v1/tao_dividends", Some(TOKEN))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "simulated");
    let value = body["dividend_value"].as_f64().unwrap();
    assert!((0.01..=0.1).contains(&value));
    assert!(fx.cache.is_empty());

    let rows = fx.history.recent(&HistoryFilter::default()).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].source, DividendSource::Simulated);

    let (_, listed) = send(fx.app(), get("/api/v1/dividend_history", Some(TOKEN))).await;
    assert_eq!(listed["records"][0]["source"], "simulated");
}

#[tokio::test]
async fn test_invalid_netuid_rejected() {
    let fx = Fixture::new();
    let (status, body) = send(
        fx.app(),
        get("/api/v1/tao_dividends?netuid=abc", Some(TOKEN)),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("netuid"));
    assert!(fx.history.is_empty());
}

#[tokio::test]
async fn test_trade_enqueues_job() {
    let fx = Fixture::new();
    let (status, body) = send(
        fx.app(),
        get("/api/v1/tao_dividends?netuid=18&trade=true", Some(TOKEN)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["trade_triggered"], true);
    assert_eq!(body["message"], "Stake operation triggered in background.");
    assert_eq!(body["status"], "success");
    assert_eq!(fx.queue.ready_len(), 1);

    let task_id = body["task_id"].as_str().unwrap().to_string();
    let (status, task) = send(
        fx.app(),
        get(&format!("/api/v1/tasks/{}", task_id), Some(TOKEN)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["id"], task_id.as_str());
    assert_eq!(task["state"], "pending");
    assert_eq!(task["netuid"], 18);
}

#[tokio::test]
async fn test_trade_false_does_not_enqueue() {
    let fx = Fixture::new();
    let (status, body) = send(
        fx.app(),
        get("/api/v1/tao_dividends?trade=false", Some(TOKEN)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["trade_triggered"], false);
    assert_eq!(fx.queue.ready_len(), 0);
}

#[tokio::test]
async fn test_enqueue_failure_is_partial_success() {
    let chain = Arc::new(ChainConnection::with_client(Arc::new(FixedChain { rao: 0 })));
    let state = Arc::new(AppState::new(
        ServiceConfig::default(),
        Arc::new(MemoryCache::new()),
        chain,
        Arc::new(BrokenQueue),
        None,
    ));

    let (status, body) = send(
        build_router(state),
        get("/api/v1/tao_dividends?trade=true", Some(TOKEN)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "partial_success");
    assert_eq!(body["trade_triggered"], false);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Failed to trigger stake operation:"));
    assert_eq!(body["dividend_value"], 0.0);
}

// ============================================================================
// AUTHENTICATION
// ============================================================================

#[tokio::test]
async fn test_missing_token_forbidden() {
    let fx = Fixture::new();
    let (status, body) = send(fx.app(), get("/api/v1/tao_dividends", None)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"], "Invalid or missing token");
}

#[tokio::test]
async fn test_invalid_token_forbidden() {
    let fx = Fixture::new();
    let (status, body) = send(
        fx.app(),
        get("/api/v1/tao_dividends", Some("invalid_token")),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"], "Invalid or missing token");
    assert!(fx.history.is_empty());
}

#[tokio::test]
async fn test_issued_jwt_grants_access() {
    let fx = Fixture::with_jwt();
    let (status, token) = send(fx.app(), post("/token", Some(TOKEN))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(token["token_type"], "bearer");
    assert_eq!(token["expires_in"], 1800);

    let jwt = token["access_token"].as_str().unwrap();
    let (status, body) = send(
        fx.app(),
        get("/api/v1/tao_dividends?trade=true", Some(jwt)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["trade_triggered"], true);
}

#[tokio::test]
async fn test_token_endpoint_requires_static_token() {
    let fx = Fixture::new();

    let (status, _) = send(fx.app(), post("/token", None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(fx.app(), post("/token", Some("nope"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"], "Invalid or missing token");
}

#[tokio::test]
async fn test_read_only_token_cannot_trade() {
    let fx = Fixture::with_jwt();
    let reader = fx
        .state
        .auth
        .issue_scoped("reader", &[Scope::Read])
        .unwrap()
        .access_token;

    let (status, _) = send(fx.app(), get("/api/v1/tao_dividends", Some(&reader))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        fx.app(),
        get("/api/v1/tao_dividends?trade=true", Some(&reader)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"], "Not enough permissions. Required: stake");
    assert_eq!(fx.queue.ready_len(), 0);
}

#[tokio::test]
async fn test_token_signed_with_empty_secret_rejected_without_jwt_config() {
    let fx = Fixture::new();
    let now = chrono::Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: "attacker".to_string(),
        scopes: Scope::ALL.to_vec(),
        iat: now,
        exp: now + 3600,
    };
    let forged = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(fx.state.config.auth.jwt_secret.as_bytes()),
    )
    .unwrap();

    let (status, body) = send(
        fx.app(),
        get("/api/v1/tao_dividends?trade=true", Some(&forged)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"], "Invalid or missing token");
    assert_eq!(fx.queue.ready_len(), 0);
    assert!(fx.history.is_empty());
}

#[tokio::test]
async fn test_token_endpoint_disabled_without_jwt_secret() {
    let fx = Fixture::new();
    let (status, body) = send(fx.app(), post("/token", Some(TOKEN))).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["detail"].as_str().unwrap().contains("JWT_SECRET_KEY"));

    let (status, _) = send(fx.app(), get("/api/v1/tao_dividends", Some(TOKEN))).await;
    assert_eq!(status, StatusCode::OK);
}

// ============================================================================
// HEALTH
// ============================================================================

#[tokio::test]
async fn test_health_without_auth() {
    let fx = Fixture::new();
    let (status, body) = send(fx.app(), get("/health", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["bittensor_client"], "initialized");
    assert_eq!(body["auth"], "legacy");
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn test_health_degraded() {
    let chain = degraded_chain();
    assert!(!chain.initialize().await);
    let fx = Fixture::with_chain(chain);

    let (status, body) = send(fx.app(), get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["bittensor_client"], "not_initialized");
    assert_eq!(body["error"], "Chain client unavailable: node down");
}

// ============================================================================
// TASKS AND HISTORY
// ============================================================================

#[tokio::test]
async fn test_unknown_task_not_found() {
    let fx = Fixture::new();
    let (status, body) = send(fx.app(), get("/api/v1/tasks/missing", Some(TOKEN))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["detail"].as_str().unwrap().contains("missing"));
}

#[tokio::test]
async fn test_history_lists_lookups() {
    let fx = Fixture::new();
    send(fx.app(), get("/api/v1/tao_dividends?netuid=1", Some(TOKEN))).await;
    send(fx.app(), get("/api/v1/tao_dividends?netuid=2", Some(TOKEN))).await;
    send(fx.app(), get("/api/v1/tao_dividends?netuid=2", Some(TOKEN))).await;

    let (status, body) = send(fx.app(), get("/api/v1/dividend_history", Some(TOKEN))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);
    assert_eq!(body["records"][0]["netuid"], 2);
    assert_eq!(body["records"][0]["source"], "cache");
    assert_eq!(body["records"][1]["source"], "chain");

    let (_, filtered) = send(
        fx.app(),
        get("/api/v1/dividend_history?netuid=1", Some(TOKEN)),
    )
    .await;
    assert_eq!(filtered["count"], 1);

    let (_, limited) = send(
        fx.app(),
        get("/api/v1/dividend_history?limit=2", Some(TOKEN)),
    )
    .await;
    assert_eq!(limited["count"], 2);
}

#[tokio::test]
async fn test_history_unavailable_when_disabled() {
    let chain = Arc::new(ChainConnection::with_client(Arc::new(FixedChain { rao: 1 })));
    let state = Arc::new(AppState::new(
        ServiceConfig::default(),
        Arc::new(MemoryCache::new()),
        chain,
        Arc::new(MemoryJobQueue::new()),
        None,
    ));

    let (status, _) = send(
        build_router(Arc::clone(&state)),
        get("/api/v1/dividend_history", Some(TOKEN)),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, _) = send(
        build_router(state),
        get("/api/v1/tao_dividends", Some(TOKEN)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_history_requires_auth() {
    let fx = Fixture::new();
    let (status, _) = send(fx.app(), get("/api/v1/dividend_history", None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
