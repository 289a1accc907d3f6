//! Worker loops draining the stake queue

use super::queue::{JobQueue, JobRecord, JobState, QueueError, StakeJob};
use super::stake::StakeJobOutcome;
use crate::config::QueueConfig;
use crate::staking::StakeError;
use crate::util::timestamp::now_ms;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Runs a single job
#[async_trait]
pub trait JobProcessor: Send + Sync {
    async fn process(&self, job: &StakeJob) -> Result<StakeJobOutcome, StakeError>;
}

pub struct StakeWorker {
    queue: Arc<dyn JobQueue>,
    processor: Arc<dyn JobProcessor>,
    config: QueueConfig,
}

/// Running worker loops
pub struct WorkerHandle {
    pub tasks: Vec<JoinHandle<()>>,
    pub shutdown_tx: watch::Sender<bool>,
}

impl WorkerHandle {
    /// Signal all loops to stop after their current job
    pub fn shutdown(&self) {
        if let Err(e) = self.shutdown_tx.send(true) {
            warn!("Failed to send shutdown signal to worker loops: {}", e);
        }
    }

    pub async fn join(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                error!("Worker loop panicked: {}", e);
            }
        }
    }
}

impl StakeWorker {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        processor: Arc<dyn JobProcessor>,
        config: QueueConfig,
    ) -> Self {
        Self {
            queue,
            processor,
            config,
        }
    }

    /// Spawn `worker_concurrency` loops sharing the queue
    pub fn spawn(self: Arc<Self>) -> WorkerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let loops = self.config.worker_concurrency.max(1);
        info!(
            "Starting {} worker loop(s) on queue {:?}",
            loops, self.config.queue_name
        );

        let tasks = (0..loops)
            .map(|n| {
                let worker = Arc::clone(&self);
                let shutdown_rx = shutdown_rx.clone();
                tokio::spawn(async move { worker.run_loop(n, shutdown_rx).await })
            })
            .collect();

        WorkerHandle { tasks, shutdown_tx }
    }

    async fn run_loop(&self, n: usize, shutdown_rx: watch::Receiver<bool>) {
        info!("Worker loop {} started", n);
        loop {
            let stopping = *shutdown_rx.borrow();
            if stopping {
                break;
            }
            if let Err(e) = self.run_once().await {
                error!("Worker loop {} queue error: {}", n, e);
                tokio::time::sleep(self.config.poll_interval).await;
            }
        }
        info!("Worker loop {} stopped", n);
    }

    /// Promote due retries and handle at most one job
    ///
    /// Returns the state the job ended in, or `None` if nothing was ready.
    pub async fn run_once(&self) -> Result<Option<JobState>, QueueError> {
        self.queue.promote_due().await?;
        match self.queue.dequeue(self.config.poll_interval).await? {
            Some(job) => self.handle(job).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn handle(&self, job: StakeJob) -> Result<JobState, QueueError> {
        if job.is_expired(now_ms()) {
            warn!("Dropping expired job {} (attempt {})", job.id, job.attempt);
            self.queue
                .put_record(
                    &JobRecord::for_job(&job, JobState::Expired)
                        .with_error("Job expired before it could run"),
                )
                .await?;
            return Ok(JobState::Expired);
        }

        if let Err(e) = self
            .queue
            .put_record(&JobRecord::for_job(&job, JobState::Running))
            .await
        {
            // not started yet, return it to the ready queue
            match self.queue.enqueue(&job).await {
                Ok(()) => warn!("Re-queued job {} after record write failed: {}", job.id, e),
                Err(requeue) => error!(
                    "Job {} lost: record write failed ({}) and re-queue failed ({})",
                    job.id, e, requeue
                ),
            }
            return Err(e);
        }

        match self.processor.process(&job).await {
            Ok(outcome) => {
                info!(
                    "Job {} succeeded: {:?} ({})",
                    job.id, outcome.status, outcome.message
                );
                self.queue
                    .put_record(&JobRecord::for_job(&job, JobState::Succeeded).with_outcome(outcome))
                    .await?;
                Ok(JobState::Succeeded)
            }
            Err(e) if job.can_retry() => {
                let delay = self.config.backoff_for(job.attempt);
                let retry = job.next_attempt(delay, self.config.job_expires, now_ms());
                warn!(
                    "Job {} failed (attempt {}/{}), retrying in {:?}: {}",
                    job.id,
                    job.attempt + 1,
                    job.max_retries + 1,
                    delay,
                    e
                );
                if let Err(schedule) = self.queue.schedule_retry(&retry, delay).await {
                    error!("Failed to schedule retry for job {}: {}", job.id, schedule);
                    let record = JobRecord::for_job(&job, JobState::Failed).with_error(format!(
                        "{} (retry could not be scheduled: {})",
                        e, schedule
                    ));
                    if let Err(record_err) = self.queue.put_record(&record).await {
                        error!("Failed to record job {} as failed: {}", job.id, record_err);
                    }
                    return Err(schedule);
                }
                self.queue
                    .put_record(&JobRecord::for_job(&retry, JobState::Retrying).with_error(e.to_string()))
                    .await?;
                Ok(JobState::Retrying)
            }
            Err(e) => {
                error!(
                    "Job {} failed after {} attempt(s): {}",
                    job.id,
                    job.attempt + 1,
                    e
                );
                self.queue
                    .put_record(&JobRecord::for_job(&job, JobState::Failed).with_error(e.to_string()))
                    .await?;
                Ok(JobState::Failed)
            }
        }
    }
}
