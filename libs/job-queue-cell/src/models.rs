use chrono::{DateTime, Utc, Duration};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use shared_config::AppConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: Uuid,
    pub key: String,
    pub data: Value,
    pub status: JobStatus,
    pub retry_count: u32,
    pub retry_policy: RetryPolicy,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Earliest instant at which a worker may claim the job.
    pub run_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub worker_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Retrying,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn can_transition_to(&self, target: &JobStatus) -> bool {
        use JobStatus::*;
        match (self, target) {
            (Queued, Processing) => true,
            (Retrying, Processing) => true,
            (Processing, Completed) => true,
            (Processing, Retrying) => true,
            (Processing, Failed) => true,
            (Processing, Queued) => true,
            (Failed, Queued) => true,
            _ => false,
        }
    }
}

/// Bounded exponential backoff: attempt `n` waits `base_delay * 2^(n-1)`,
/// never more than `max_delay`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 5_000,
            max_delay_ms: 300_000,
        }
    }
}

impl RetryPolicy {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_retries: config.job_max_retries,
            base_delay_ms: config.job_backoff_seconds.saturating_mul(1_000),
            ..Self::default()
        }
    }

    pub fn backoff(&self, retry_count: u32) -> Duration {
        let exponent = retry_count.saturating_sub(1).min(20);
        let delay = self.base_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_delay_ms);
        Duration::milliseconds(delay as i64)
    }
}

impl Job {
    pub fn new(key: &str, data: Value, retry_policy: RetryPolicy) -> Self {
        let now = Utc::now();
        Self {
            job_id: Uuid::new_v4(),
            key: key.to_string(),
            data,
            status: JobStatus::Queued,
            retry_count: 0,
            retry_policy,
            created_at: now,
            updated_at: now,
            run_at: now,
            completed_at: None,
            error_message: None,
            worker_id: None,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.retry_policy.max_retries
    }

    pub fn can_retry(&self) -> bool {
        self.retry_count < self.retry_policy.max_retries
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.run_at <= now
    }

    pub fn mark_processing(&mut self, worker_id: &str, now: DateTime<Utc>) {
        self.status = JobStatus::Processing;
        self.worker_id = Some(worker_id.to_string());
        self.updated_at = now;
    }

    /// Schedules the next attempt with backoff, or parks the job as failed
    /// once the retry budget is spent. Returns the resulting status.
    pub fn record_failure(&mut self, error_message: String, now: DateTime<Utc>) -> JobStatus {
        self.error_message = Some(error_message);
        self.worker_id = None;
        self.updated_at = now;

        if self.can_retry() {
            self.retry_count += 1;
            self.status = JobStatus::Retrying;
            self.run_at = now + self.retry_policy.backoff(self.retry_count);
        } else {
            self.status = JobStatus::Failed;
            self.completed_at = Some(now);
        }

        self.status
    }

    /// Returns a job abandoned mid-run to the queue. The retry budget is kept.
    pub fn release(&mut self, now: DateTime<Utc>) {
        self.status = JobStatus::Queued;
        self.worker_id = None;
        self.updated_at = now;
    }

    /// A processing job whose last update is older than `stalled_before`.
    pub fn is_stalled(&self, stalled_before: DateTime<Utc>) -> bool {
        self.status == JobStatus::Processing && self.updated_at < stalled_before
    }

    /// Puts a failed job back in line with a fresh retry budget.
    pub fn requeue(&mut self, now: DateTime<Utc>) {
        self.status = JobStatus::Queued;
        self.retry_count = 0;
        self.run_at = now;
        self.updated_at = now;
        self.completed_at = None;
        self.worker_id = None;
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QueueStats {
    pub queued_jobs: u64,
    pub delayed_jobs: u64,
    pub processing_jobs: u64,
    pub failed_jobs: u64,
    pub completed_total: u64,
    pub retried_total: u64,
    pub queue_health: QueueHealth,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub enum QueueHealth {
    #[default]
    Healthy,
    Degraded { reason: String },
}

impl QueueStats {
    pub fn with_health(mut self) -> Self {
        self.queue_health = if self.failed_jobs > 0 {
            QueueHealth::Degraded {
                reason: format!("{} job(s) waiting in the dead-letter list", self.failed_jobs),
            }
        } else {
            QueueHealth::Healthy
        };
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub worker_id: String,
    pub max_concurrent_jobs: u32,
    pub job_timeout_seconds: u64,
    pub poll_interval_ms: u64,
    pub health_check_interval_seconds: u64,
    pub graceful_shutdown_timeout_seconds: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_id: format!("worker-{}", Uuid::new_v4()),
            max_concurrent_jobs: 2,
            job_timeout_seconds: 60,
            poll_interval_ms: 250,
            health_check_interval_seconds: 60,
            graceful_shutdown_timeout_seconds: 30,
        }
    }
}

impl WorkerConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_concurrent_jobs: config.worker_concurrency.max(1),
            ..Self::default()
        }
    }

    /// How long a job may sit in `Processing` before another worker treats
    /// it as abandoned. A live worker always settles a job within its
    /// timeout, so twice the timeout leaves room for clock skew.
    pub fn stalled_after(&self) -> Duration {
        Duration::seconds((self.job_timeout_seconds as i64).saturating_mul(2))
    }
}
