//! Lazily connected chain client
//!
//! The first caller of `get()` connects. Callers arriving while that connect
//! is still running fail fast with `Unavailable` instead of queueing behind
//! it. A failed connect leaves the slot empty so a later call retries.

use super::{ChainClient, ChainError, SubtensorClient};
use crate::config::ChainConfig;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use tracing::{info, warn};

/// Produces a connected client
pub type Connector =
    Arc<dyn Fn() -> BoxFuture<'static, Result<Arc<dyn ChainClient>, ChainError>> + Send + Sync>;

pub struct ChainConnection {
    client: OnceCell<Arc<dyn ChainClient>>,
    /// Held for the whole retry cycle of a connect
    connecting: Mutex<()>,
    connector: Connector,
    attempts: u32,
    backoff: Duration,
    last_error: RwLock<Option<String>>,
}

impl ChainConnection {
    /// Connect to the node described by `config` on first use
    pub fn new(config: ChainConfig) -> Self {
        let attempts = config.connect_attempts;
        let backoff = config.connect_backoff;
        let config = Arc::new(config);
        let connector: Connector = Arc::new(move || {
            let config = Arc::clone(&config);
            async move {
                let client = SubtensorClient::connect(&config).await?;
                Ok::<_, ChainError>(Arc::new(client) as Arc<dyn ChainClient>)
            }
            .boxed()
        });
        Self::with_connector(connector, attempts, backoff)
    }

    pub fn with_connector(connector: Connector, attempts: u32, backoff: Duration) -> Self {
        Self {
            client: OnceCell::new(),
            connecting: Mutex::new(()),
            connector,
            attempts: attempts.max(1),
            backoff,
            last_error: RwLock::new(None),
        }
    }

    /// Wrap an already connected client
    pub fn with_client(client: Arc<dyn ChainClient>) -> Self {
        let connector: Connector = Arc::new(|| {
            async {
                Err::<Arc<dyn ChainClient>, _>(ChainError::Unavailable(
                    "no connector configured".to_string(),
                ))
            }
            .boxed()
        });
        Self {
            client: OnceCell::new_with(Some(client)),
            connecting: Mutex::new(()),
            connector,
            attempts: 1,
            backoff: Duration::ZERO,
            last_error: RwLock::new(None),
        }
    }

    /// Get the client, connecting if needed
    pub async fn get(&self) -> Result<Arc<dyn ChainClient>, ChainError> {
        if let Some(client) = self.client.get() {
            return Ok(Arc::clone(client));
        }

        let Ok(_connecting) = self.connecting.try_lock() else {
            return Err(ChainError::Unavailable(
                "chain connection attempt already in progress".to_string(),
            ));
        };
        // another caller may have finished connecting before we took the lock
        if let Some(client) = self.client.get() {
            return Ok(Arc::clone(client));
        }

        let client = self.connect_with_retry().await?;
        let _ = self.client.set(Arc::clone(&client));
        Ok(client)
    }

    /// Connect eagerly; returns false and leaves the service degraded on failure
    pub async fn initialize(&self) -> bool {
        match self.get().await {
            Ok(_) => true,
            Err(e) => {
                warn!("Chain client not initialized, running degraded: {}", e);
                false
            }
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.client.initialized()
    }

    /// Error from the most recent failed connect, if still uninitialized
    pub fn initialization_error(&self) -> Option<String> {
        if self.is_initialized() {
            return None;
        }
        self.last_error.read().clone()
    }

    async fn connect_with_retry(&self) -> Result<Arc<dyn ChainClient>, ChainError> {
        let mut delay = self.backoff;
        let mut last_error = String::new();

        for attempt in 1..=self.attempts {
            match (self.connector)().await {
                Ok(client) => {
                    info!("Chain client initialized (attempt {})", attempt);
                    *self.last_error.write() = None;
                    return Ok(client);
                }
                Err(e) => {
                    warn!(
                        "Chain connect attempt {}/{} failed: {}",
                        attempt, self.attempts, e
                    );
                    last_error = e.to_string();
                    if attempt < self.attempts {
                        tokio::time::sleep(delay).await;
                        delay = delay.saturating_mul(2);
                    }
                }
            }
        }

        *self.last_error.write() = Some(last_error.clone());
        Err(ChainError::Unavailable(last_error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FixedClient;

    #[async_trait]
    impl ChainClient for FixedClient {
        async fn tao_dividends(&self, _netuid: u16, _hotkey: &str) -> Result<u64, ChainError> {
            Ok(42)
        }

        async fn add_stake(&self, _: &str, _: u16, _: u64) -> Result<String, ChainError> {
            Ok("0xadd".to_string())
        }

        async fn remove_stake(&self, _: &str, _: u16, _: u64) -> Result<String, ChainError> {
            Ok("0xremove".to_string())
        }
    }

    fn flaky_connector(calls: Arc<AtomicU32>, succeed_on: u32) -> Connector {
        Arc::new(move || {
            let calls = Arc::clone(&calls);
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n >= succeed_on {
                    Ok(Arc::new(FixedClient) as Arc<dyn ChainClient>)
                } else {
                    Err(ChainError::Unavailable(format!("attempt {} refused", n)))
                }
            }
            .boxed()
        })
    }

    #[tokio::test]
    async fn test_retries_until_connected() {
        let calls = Arc::new(AtomicU32::new(0));
        let conn = ChainConnection::with_connector(
            flaky_connector(Arc::clone(&calls), 3),
            3,
            Duration::from_millis(1),
        );

        assert!(!conn.is_initialized());
        let client = conn.get().await.unwrap();
        assert_eq!(client.tao_dividends(18, "x").await.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(conn.is_initialized());
        assert!(conn.initialization_error().is_none());

        // connected once, reused afterwards
        conn.get().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_failure_leaves_slot_empty() {
        let calls = Arc::new(AtomicU32::new(0));
        let conn = ChainConnection::with_connector(
            flaky_connector(Arc::clone(&calls), 3),
            2,
            Duration::from_millis(1),
        );

        assert!(!conn.initialize().await);
        assert!(!conn.is_initialized());
        assert_eq!(
            conn.initialization_error().as_deref(),
            Some("Chain client unavailable: attempt 2 refused")
        );

        // next call retries and succeeds on the third overall attempt
        assert!(conn.initialize().await);
        assert!(conn.is_initialized());
        assert!(conn.initialization_error().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_callers_do_not_wait_on_failing_connect() {
        let calls = Arc::new(AtomicU32::new(0));
        let counted = Arc::clone(&calls);
        let connector: Connector = Arc::new(move || {
            let counted = Arc::clone(&counted);
            async move {
                counted.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(100)).await;
                Err::<Arc<dyn ChainClient>, _>(ChainError::Unavailable("node down".to_string()))
            }
            .boxed()
        });
        let conn = Arc::new(ChainConnection::with_connector(
            connector,
            3,
            Duration::from_millis(50),
        ));

        let started = std::time::Instant::now();
        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let conn = Arc::clone(&conn);
                tokio::spawn(async move {
                    let began = std::time::Instant::now();
                    let result = conn.get().await;
                    (result.is_err(), began.elapsed())
                })
            })
            .collect();

        let mut worst = Duration::ZERO;
        for task in tasks {
            let (failed, elapsed) = task.await.unwrap();
            assert!(failed);
            worst = worst.max(elapsed);
        }

        // one retry cycle is 3 x 100ms plus 50ms + 100ms of backoff
        assert!(worst < Duration::from_millis(1500), "worst latency {:?}", worst);
        assert!(started.elapsed() < Duration::from_millis(1500));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(!conn.is_initialized());
    }

    #[tokio::test]
    async fn test_with_client_is_initialized() {
        let conn = ChainConnection::with_client(Arc::new(FixedClient));
        assert!(conn.is_initialized());
        let client = conn.get().await.unwrap();
        assert_eq!(client.add_stake("h", 1, 1).await.unwrap(), "0xadd");
    }
}
