//! Redis-backed job queue
//!
//! - ready jobs: a list, `LPUSH` to enqueue and `BRPOP` to take
//! - delayed retries: a sorted set scored by ready time in ms
//! - status records: `job:{id}` strings with a TTL
//!
//! Several workers may promote the same delayed job; only the one whose
//! `ZREM` removes it pushes it to the ready list.

use super::queue::{JobQueue, JobRecord, QueueError, StakeJob};
use crate::config::QueueConfig;
use crate::util::redis::LazyRedis;
use crate::util::timestamp::now_ms;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// Delayed jobs promoted per pass
const PROMOTE_BATCH: isize = 100;

pub struct RedisJobQueue {
    /// Shared connection for non-blocking commands
    commands: LazyRedis,
    /// Separate connection so `BRPOP` does not stall other commands
    blocking: LazyRedis,
    ready_key: String,
    delayed_key: String,
    result_ttl: Duration,
}

impl RedisJobQueue {
    pub fn new(config: &QueueConfig) -> Result<Self, QueueError> {
        Ok(Self {
            commands: LazyRedis::open(&config.redis_url)?,
            blocking: LazyRedis::open(&config.redis_url)?,
            ready_key: config.queue_name.clone(),
            delayed_key: format!("{}:delayed", config.queue_name),
            result_ttl: config.result_ttl,
        })
    }

    pub fn record_key(id: &str) -> String {
        format!("job:{}", id)
    }
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn enqueue(&self, job: &StakeJob) -> Result<(), QueueError> {
        let payload = serde_json::to_string(job)?;
        let mut conn = self.commands.connection().await?;
        let _: i64 = redis::cmd("LPUSH")
            .arg(&self.ready_key)
            .arg(payload)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn schedule_retry(&self, job: &StakeJob, delay: Duration) -> Result<(), QueueError> {
        let payload = serde_json::to_string(job)?;
        let ready_at = now_ms() + delay.as_millis() as i64;
        let mut conn = self.commands.connection().await?;
        let _: i64 = redis::cmd("ZADD")
            .arg(&self.delayed_key)
            .arg(ready_at)
            .arg(payload)
            .query_async(&mut conn)
            .await?;
        debug!("Job {} scheduled for retry in {:?}", job.id, delay);
        Ok(())
    }

    async fn promote_due(&self) -> Result<usize, QueueError> {
        let mut conn = self.commands.connection().await?;
        let due: Vec<String> = redis::cmd("ZRANGEBYSCORE")
            .arg(&self.delayed_key)
            .arg("-inf")
            .arg(now_ms())
            .arg("LIMIT")
            .arg(0)
            .arg(PROMOTE_BATCH)
            .query_async(&mut conn)
            .await?;

        let mut promoted = 0;
        for payload in due {
            let removed: i64 = redis::cmd("ZREM")
                .arg(&self.delayed_key)
                .arg(&payload)
                .query_async(&mut conn)
                .await?;
            if removed == 0 {
                // another worker owns it
                continue;
            }
            let _: i64 = redis::cmd("LPUSH")
                .arg(&self.ready_key)
                .arg(&payload)
                .query_async(&mut conn)
                .await?;
            promoted += 1;
        }
        if promoted > 0 {
            debug!("Promoted {} delayed job(s)", promoted);
        }
        Ok(promoted)
    }

    async fn dequeue(&self, wait: Duration) -> Result<Option<StakeJob>, QueueError> {
        let mut conn = self.blocking.connection().await?;
        let popped: Option<(String, String)> = redis::cmd("BRPOP")
            .arg(&self.ready_key)
            .arg(wait.as_secs().max(1))
            .query_async(&mut conn)
            .await?;

        match popped {
            Some((_, payload)) => match serde_json::from_str(&payload) {
                Ok(job) => Ok(Some(job)),
                Err(e) => {
                    warn!("Dropping malformed job payload: {}", e);
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    async fn put_record(&self, record: &JobRecord) -> Result<(), QueueError> {
        let payload = serde_json::to_string(record)?;
        let mut conn = self.commands.connection().await?;
        let _: () = redis::cmd("SET")
            .arg(Self::record_key(&record.id))
            .arg(payload)
            .arg("EX")
            .arg(self.result_ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn get_record(&self, id: &str) -> Result<Option<JobRecord>, QueueError> {
        let mut conn = self.commands.connection().await?;
        let payload: Option<String> = redis::cmd("GET")
            .arg(Self::record_key(id))
            .query_async(&mut conn)
            .await?;
        payload
            .map(|p| serde_json::from_str(&p).map_err(QueueError::from))
            .transpose()
    }
}
