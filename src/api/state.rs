//! Shared state used across all API endpoints.

use crate::cache::{DividendCache, RedisCache};
use crate::chain::ChainConnection;
use crate::config::ServiceConfig;
use crate::crypto::auth::TokenAuthority;
use crate::dividends::DividendService;
use crate::storage::{HistoryStore, PgHistoryStore};
use crate::worker::{JobQueue, RedisJobQueue};
use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn};

pub struct AppState {
    pub config: ServiceConfig,
    pub auth: TokenAuthority,
    pub chain: Arc<ChainConnection>,
    pub dividends: DividendService,
    pub queue: Arc<dyn JobQueue>,
    /// `None` when history logging is disabled
    pub history: Option<Arc<dyn HistoryStore>>,
}

impl AppState {
    pub fn new(
        config: ServiceConfig,
        cache: Arc<dyn DividendCache>,
        chain: Arc<ChainConnection>,
        queue: Arc<dyn JobQueue>,
        history: Option<Arc<dyn HistoryStore>>,
    ) -> Self {
        let auth = TokenAuthority::new(&config.auth);
        let dividends = DividendService::new(cache, Arc::clone(&chain), config.cache.dividend_ttl);
        Self {
            config,
            auth,
            chain,
            dividends,
            queue,
            history,
        }
    }

    /// Wire the production backends from configuration
    ///
    /// Redis connections are lazy. A database that cannot be reached disables
    /// history logging instead of failing startup.
    pub async fn connect(config: ServiceConfig) -> anyhow::Result<Self> {
        let cache = RedisCache::new(&config.cache.redis_url).context("Invalid REDIS_URL")?;
        let queue = RedisJobQueue::new(&config.queue).context("Invalid queue Redis URL")?;
        let chain = Arc::new(ChainConnection::new(config.chain.clone()));
        let history = connect_history(&config).await;

        Ok(Self::new(
            config,
            Arc::new(cache),
            chain,
            Arc::new(queue),
            history,
        ))
    }
}

/// Open the history store if `DATABASE_URL` is configured and reachable
pub async fn connect_history(config: &ServiceConfig) -> Option<Arc<dyn HistoryStore>> {
    let Some(url) = &config.database.url else {
        info!("DATABASE_URL not set, dividend history logging disabled");
        return None;
    };
    match PgHistoryStore::connect(url).await {
        Ok(store) => Some(Arc::new(store)),
        Err(e) => {
            warn!("History database unavailable, logging disabled: {}", e);
            None
        }
    }
}
