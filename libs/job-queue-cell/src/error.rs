use thiserror::Error;

#[derive(Error, Debug)]
pub enum JobQueueError {
    #[error("Queue operation failed: {0}")]
    QueueError(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Invalid job status transition from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("Redis connection error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Worker timeout: operation took longer than {timeout_seconds} seconds")]
    WorkerTimeout { timeout_seconds: u64 },

    #[error("Maximum retry attempts ({max_retries}) exceeded for job {job_id}")]
    MaxRetriesExceeded { job_id: String, max_retries: u32 },

    #[error("Job handler for '{key}' failed: {reason}")]
    HandlerFailed { key: String, reason: String },

    #[error("No handler registered for job key '{0}'")]
    NoHandler(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl JobQueueError {
    pub fn handler_failed(key: &str, reason: impl ToString) -> Self {
        JobQueueError::HandlerFailed {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}
