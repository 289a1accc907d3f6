//! Job queue seam, job messages and status records

use super::stake::StakeJobOutcome;
use crate::config::QueueConfig;
use crate::util::timestamp::now_ms;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Queue message for one stake decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakeJob {
    pub id: String,
    pub netuid: u16,
    pub hotkey: String,
    pub enqueued_at_ms: i64,
    /// Jobs not started by this time are dropped
    pub expires_at_ms: i64,
    /// 0 for the first run
    pub attempt: u32,
    pub max_retries: u32,
}

impl StakeJob {
    pub fn new(netuid: u16, hotkey: &str, config: &QueueConfig) -> Self {
        let now = now_ms();
        Self {
            id: Uuid::new_v4().to_string(),
            netuid,
            hotkey: hotkey.to_string(),
            enqueued_at_ms: now,
            expires_at_ms: now + config.job_expires.as_millis() as i64,
            attempt: 0,
            max_retries: config.max_retries,
        }
    }

    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms > self.expires_at_ms
    }

    pub fn can_retry(&self) -> bool {
        self.attempt < self.max_retries
    }

    /// The follow-up run after `delay`, with a fresh expiry window from its ready time
    pub fn next_attempt(&self, delay: Duration, expires: Duration, now_ms: i64) -> Self {
        let ready_at = now_ms + delay.as_millis() as i64;
        Self {
            attempt: self.attempt + 1,
            expires_at_ms: ready_at + expires.as_millis() as i64,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Running,
    Retrying,
    Succeeded,
    Failed,
    Expired,
}

/// Queryable status of a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub netuid: u16,
    pub hotkey: String,
    pub state: JobState,
    pub attempt: u32,
    pub updated_at_ms: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<StakeJobOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobRecord {
    pub fn for_job(job: &StakeJob, state: JobState) -> Self {
        Self {
            id: job.id.clone(),
            netuid: job.netuid,
            hotkey: job.hotkey.clone(),
            state,
            attempt: job.attempt,
            updated_at_ms: now_ms(),
            outcome: None,
            error: None,
        }
    }

    pub fn with_outcome(mut self, outcome: StakeJobOutcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Make a job ready immediately
    async fn enqueue(&self, job: &StakeJob) -> Result<(), QueueError>;

    /// Make a job ready after `delay`
    async fn schedule_retry(&self, job: &StakeJob, delay: Duration) -> Result<(), QueueError>;

    /// Move delayed jobs whose time has come to the ready queue
    async fn promote_due(&self) -> Result<usize, QueueError>;

    /// Take the oldest ready job, waiting up to `wait` for one
    async fn dequeue(&self, wait: Duration) -> Result<Option<StakeJob>, QueueError>;

    async fn put_record(&self, record: &JobRecord) -> Result<(), QueueError>;

    async fn get_record(&self, id: &str) -> Result<Option<JobRecord>, QueueError>;
}

/// Build a job, record it as pending and push it
pub async fn enqueue_stake_job(
    queue: &dyn JobQueue,
    netuid: u16,
    hotkey: &str,
    config: &QueueConfig,
) -> Result<StakeJob, QueueError> {
    let job = StakeJob::new(netuid, hotkey, config);
    queue
        .put_record(&JobRecord::for_job(&job, JobState::Pending))
        .await?;
    queue.enqueue(&job).await?;
    info!(
        "Enqueued stake job {} for netuid={} hotkey={}",
        job.id, netuid, hotkey
    );
    Ok(job)
}

// ============================================================================
// IN-MEMORY QUEUE
// ============================================================================

/// In-process queue for tests and single-process runs
#[derive(Default)]
pub struct MemoryJobQueue {
    ready: Mutex<VecDeque<StakeJob>>,
    delayed: Mutex<Vec<(i64, StakeJob)>>,
    records: Mutex<HashMap<String, JobRecord>>,
    notify: Notify,
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ready_len(&self) -> usize {
        self.ready.lock().len()
    }

    /// Delayed jobs with their ready time in ms
    pub fn delayed(&self) -> Vec<(i64, StakeJob)> {
        self.delayed.lock().clone()
    }

    fn pop_ready(&self) -> Option<StakeJob> {
        self.ready.lock().pop_front()
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn enqueue(&self, job: &StakeJob) -> Result<(), QueueError> {
        self.ready.lock().push_back(job.clone());
        self.notify.notify_one();
        Ok(())
    }

    async fn schedule_retry(&self, job: &StakeJob, delay: Duration) -> Result<(), QueueError> {
        let ready_at = now_ms() + delay.as_millis() as i64;
        self.delayed.lock().push((ready_at, job.clone()));
        Ok(())
    }

    async fn promote_due(&self) -> Result<usize, QueueError> {
        let now = now_ms();
        let due: Vec<StakeJob> = {
            let mut delayed = self.delayed.lock();
            let (due, waiting): (Vec<_>, Vec<_>) =
                delayed.drain(..).partition(|(ready_at, _)| *ready_at <= now);
            *delayed = waiting;
            due.into_iter().map(|(_, job)| job).collect()
        };
        let count = due.len();
        for job in due {
            self.enqueue(&job).await?;
        }
        Ok(count)
    }

    async fn dequeue(&self, wait: Duration) -> Result<Option<StakeJob>, QueueError> {
        if let Some(job) = self.pop_ready() {
            return Ok(Some(job));
        }
        let _ = tokio::time::timeout(wait, self.notify.notified()).await;
        Ok(self.pop_ready())
    }

    async fn put_record(&self, record: &JobRecord) -> Result<(), QueueError> {
        self.records
            .lock()
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn get_record(&self, id: &str) -> Result<Option<JobRecord>, QueueError> {
        Ok(self.records.lock().get(id).cloned())
    }
}
