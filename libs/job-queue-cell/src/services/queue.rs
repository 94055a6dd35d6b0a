use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Job, JobQueueError, QueueStats};

/// Durable store of jobs keyed by handler name.
///
/// Jobs of one key are delivered in FIFO order among those that are due.
/// Delivery is at-least-once: a job claimed by a worker that dies before
/// calling `complete` or `fail` is handed out again once `recover_stalled`
/// sees it has been processing for too long.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, job: &Job) -> Result<(), JobQueueError>;

    /// Hands the oldest due job of any of `keys` to `worker_id`.
    async fn claim(&self, keys: &[String], worker_id: &str) -> Result<Option<Job>, JobQueueError>;

    /// Removes a processed job.
    async fn complete(&self, job_id: Uuid) -> Result<(), JobQueueError>;

    /// Records a failed attempt. The returned job is either `Retrying` with a
    /// future `run_at`, or `Failed` and parked in its key's dead-letter list.
    async fn fail(&self, job_id: Uuid, error_message: String) -> Result<Job, JobQueueError>;

    async fn get_job(&self, job_id: Uuid) -> Result<Option<Job>, JobQueueError>;

    async fn failed_jobs(&self, key: &str) -> Result<Vec<Job>, JobQueueError>;

    /// Moves a dead job back to the pending list with a fresh retry budget.
    async fn retry_failed(&self, job_id: Uuid) -> Result<Job, JobQueueError>;

    /// Returns jobs that have been `Processing` since before `stalled_before`
    /// to the front of their pending list. Jobs claimed more recently are
    /// left to the worker holding them.
    async fn recover_stalled(&self, stalled_before: DateTime<Utc>) -> Result<u64, JobQueueError>;

    async fn stats(&self) -> Result<QueueStats, JobQueueError>;
}

/// A unit of background work selected by `Job::key`.
#[async_trait]
pub trait JobHandler: Send + Sync {
    fn key(&self) -> &str;

    async fn handle(&self, job: &Job) -> Result<(), JobQueueError>;
}
