//! Dividend cache
//!
//! Values are stored as strings with a TTL. The cache never interprets what it
//! stores; callers parse and validate on read.

mod memory;
mod redis_cache;

pub use memory::MemoryCache;
pub use redis_cache::RedisCache;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("Cache unavailable: {0}")]
    Unavailable(String),
}

/// Key/value store with per-entry expiry
#[async_trait]
pub trait DividendCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
}

/// Cache key for a subnet/hotkey dividend
pub fn dividend_cache_key(netuid: u16, hotkey: &str) -> String {
    format!("dividends:{}:{}", netuid, hotkey)
}
