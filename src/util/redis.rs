//! Lazily established Redis connection shared by the cache and the job queue.

use ::redis::aio::ConnectionManager;
use ::redis::{Client, RedisError};
use tokio::sync::OnceCell;
use tracing::info;

const CONNECT_BACKOFF_BASE: u64 = 2;
const CONNECT_BACKOFF_FACTOR_MS: u64 = 100;
const CONNECT_RETRIES: usize = 1;

/// Opens the connection manager on first use
///
/// A failed connect leaves the cell empty so the next call tries again.
pub struct LazyRedis {
    client: Client,
    conn: OnceCell<ConnectionManager>,
}

impl LazyRedis {
    pub fn open(url: &str) -> Result<Self, RedisError> {
        Ok(Self {
            client: Client::open(url)?,
            conn: OnceCell::new(),
        })
    }

    /// Get a handle to the shared connection
    pub async fn connection(&self) -> Result<ConnectionManager, RedisError> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                let manager = ConnectionManager::new_with_backoff(
                    self.client.clone(),
                    CONNECT_BACKOFF_BASE,
                    CONNECT_BACKOFF_FACTOR_MS,
                    CONNECT_RETRIES,
                )
                .await?;
                info!("Connected to Redis");
                Ok::<_, RedisError>(manager)
            })
            .await?;
        Ok(conn.clone())
    }

    pub fn is_connected(&self) -> bool {
        self.conn.initialized()
    }
}
