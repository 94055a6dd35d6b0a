use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::services::queue::JobQueue;
use crate::{Job, JobQueueError, QueueStats, RetryPolicy};

/// Entry point used by request handlers to hand work to the background workers.
pub struct JobProducerService {
    queue: Arc<dyn JobQueue>,
    retry_policy: RetryPolicy,
}

impl JobProducerService {
    pub fn new(queue: Arc<dyn JobQueue>, retry_policy: RetryPolicy) -> Self {
        Self { queue, retry_policy }
    }

    pub async fn enqueue<T: Serialize + ?Sized>(
        &self,
        key: &str,
        payload: &T,
    ) -> Result<Job, JobQueueError> {
        if key.trim().is_empty() {
            return Err(JobQueueError::ValidationError("job key must not be empty".to_string()));
        }

        let data = serde_json::to_value(payload)?;
        let job = Job::new(key, data, self.retry_policy);
        self.queue.enqueue(&job).await?;

        info!("Job {} queued under '{}'", job.job_id, key);
        Ok(job)
    }

    pub async fn get_job_status(&self, job_id: Uuid) -> Result<Option<Job>, JobQueueError> {
        self.queue.get_job(job_id).await
    }

    pub async fn failed_jobs(&self, key: &str) -> Result<Vec<Job>, JobQueueError> {
        self.queue.failed_jobs(key).await
    }

    pub async fn retry_failed_job(&self, job_id: Uuid) -> Result<Job, JobQueueError> {
        self.queue.retry_failed(job_id).await
    }

    pub async fn stats(&self) -> Result<QueueStats, JobQueueError> {
        self.queue.stats().await
    }
}
