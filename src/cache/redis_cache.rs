use super::{CacheError, DividendCache};
use crate::util::redis::LazyRedis;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Redis-backed cache using `GET` and `SET ... EX`
pub struct RedisCache {
    redis: LazyRedis,
}

impl RedisCache {
    /// Create the cache; no connection is made until first use
    pub fn new(url: &str) -> Result<Self, CacheError> {
        Ok(Self {
            redis: LazyRedis::open(url)?,
        })
    }
}

#[async_trait]
impl DividendCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.redis.connection().await?;
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        debug!(key, hit = value.is_some(), "cache lookup");
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.redis.connection().await?;
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}
