//! Background stake jobs
//!
//! The API enqueues a `StakeJob`; worker processes drain the queue, run the
//! sentiment analysis and submit the resulting stake or unstake.

pub mod queue;
pub mod redis_queue;
pub mod runner;
pub mod stake;

pub use queue::{
    enqueue_stake_job, JobQueue, JobRecord, JobState, MemoryJobQueue, QueueError, StakeJob,
};
pub use redis_queue::RedisJobQueue;
pub use runner::{JobProcessor, StakeWorker, WorkerHandle};
pub use stake::{OutcomeStatus, StakeJobOutcome, StakeProcessor};
