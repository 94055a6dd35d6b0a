use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_redis::{Config, Connection, Pool, Runtime};
use redis::AsyncCommands;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::services::queue::JobQueue;
use crate::{Job, JobQueueError, JobStatus, QueueStats};

const DEFAULT_NAMESPACE: &str = "job_queue";

/// Redis-backed queue.
///
/// Layout under the namespace `ns`:
/// - `ns:job:{id}` hash holding the serialized job
/// - `ns:{key}:pending` list, pushed left and popped right
/// - `ns:{key}:processing` list of claimed ids
/// - `ns:{key}:delayed` sorted set of retrying ids scored by `run_at` millis
/// - `ns:{key}:failed` dead-letter list; its jobs are kept until re-driven
/// - `ns:keys` set of every key seen, `ns:stats` hash of counters
pub struct RedisJobQueue {
    pool: Pool,
    namespace: String,
}

impl RedisJobQueue {
    pub async fn new(redis_url: &str) -> Result<Self, JobQueueError> {
        Self::with_namespace(redis_url, DEFAULT_NAMESPACE).await
    }

    pub async fn with_namespace(redis_url: &str, namespace: &str) -> Result<Self, JobQueueError> {
        let cfg = Config::from_url(redis_url);
        let pool = cfg.create_pool(Some(Runtime::Tokio1)).map_err(|e| {
            JobQueueError::RedisError(redis::RedisError::from((
                redis::ErrorKind::IoError,
                "Failed to create Redis pool",
                format!("Pool creation error: {}", e),
            )))
        })?;

        let queue = Self {
            pool,
            namespace: namespace.to_string(),
        };

        let mut conn = queue.get_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!("Redis job queue initialized (namespace '{}')", namespace);

        Ok(queue)
    }

    async fn get_connection(&self) -> Result<Connection, JobQueueError> {
        self.pool.get().await.map_err(|e| {
            JobQueueError::RedisError(redis::RedisError::from((
                redis::ErrorKind::IoError,
                "Failed to get Redis connection",
                format!("Pool error: {}", e),
            )))
        })
    }

    fn job_key(&self, job_id: Uuid) -> String {
        format!("{}:job:{}", self.namespace, job_id)
    }

    fn list_key(&self, key: &str, list: &str) -> String {
        format!("{}:{}:{}", self.namespace, key, list)
    }

    fn keys_set(&self) -> String {
        format!("{}:keys", self.namespace)
    }

    fn stats_key(&self) -> String {
        format!("{}:stats", self.namespace)
    }

    async fn load_job(&self, conn: &mut Connection, job_id: Uuid) -> Result<Option<Job>, JobQueueError> {
        let data: Option<String> = conn.hget(self.job_key(job_id), "data").await?;
        match data {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    async fn require_job(&self, conn: &mut Connection, job_id: Uuid) -> Result<Job, JobQueueError> {
        self.load_job(conn, job_id)
            .await?
            .ok_or_else(|| JobQueueError::JobNotFound(job_id.to_string()))
    }

    async fn store_job(&self, conn: &mut Connection, job: &Job) -> Result<(), JobQueueError> {
        let data = serde_json::to_string(job)?;
        let status = serde_json::to_string(&job.status)?;
        let _: () = conn
            .hset_multiple(
                self.job_key(job.job_id),
                &[
                    ("data", data.as_str()),
                    ("status", status.as_str()),
                    ("key", job.key.as_str()),
                ],
            )
            .await?;
        Ok(())
    }

    /// Moves retrying jobs whose `run_at` has passed back to the pending list.
    /// Only the caller whose ZREM succeeds pushes the id, so concurrent
    /// promoters never duplicate a job.
    async fn promote_due(&self, conn: &mut Connection, key: &str) -> Result<(), JobQueueError> {
        let delayed = self.list_key(key, "delayed");
        let now_ms = Utc::now().timestamp_millis();
        let due: Vec<String> = conn.zrangebyscore(&delayed, "-inf", now_ms).await?;

        for job_id in due {
            let removed: i64 = conn.zrem(&delayed, &job_id).await?;
            if removed == 1 {
                let _: () = conn.lpush(self.list_key(key, "pending"), &job_id).await?;
                debug!("Promoted delayed job {} under '{}'", job_id, key);
            }
        }

        Ok(())
    }

    async fn incr_stat(&self, conn: &mut Connection, field: &str) -> Result<(), JobQueueError> {
        let _: i64 = conn.hincr(self.stats_key(), field, 1).await?;
        Ok(())
    }
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn enqueue(&self, job: &Job) -> Result<(), JobQueueError> {
        let mut conn = self.get_connection().await?;

        self.store_job(&mut conn, job).await?;
        let _: () = conn.sadd(self.keys_set(), &job.key).await?;

        if job.run_at > Utc::now() {
            let _: () = conn
                .zadd(self.list_key(&job.key, "delayed"), job.job_id.to_string(), job.run_at.timestamp_millis())
                .await?;
        } else {
            let _: () = conn
                .lpush(self.list_key(&job.key, "pending"), job.job_id.to_string())
                .await?;
        }

        debug!("Job {} enqueued under '{}'", job.job_id, job.key);
        Ok(())
    }

    async fn claim(&self, keys: &[String], worker_id: &str) -> Result<Option<Job>, JobQueueError> {
        let mut conn = self.get_connection().await?;

        for key in keys {
            self.promote_due(&mut conn, key).await?;

            let pending = self.list_key(key, "pending");
            let processing = self.list_key(key, "processing");

            let claimed: Option<String> = conn.rpoplpush(&pending, &processing).await?;
            let Some(raw_id) = claimed else { continue };

            let job_id = match Uuid::parse_str(&raw_id) {
                Ok(id) => id,
                Err(_) => {
                    warn!("Dropping malformed job id '{}' from '{}'", raw_id, pending);
                    let _: i64 = conn.lrem(&processing, 1, &raw_id).await?;
                    continue;
                }
            };

            match self.load_job(&mut conn, job_id).await? {
                Some(mut job) => {
                    job.mark_processing(worker_id, Utc::now());
                    self.store_job(&mut conn, &job).await?;
                    debug!("Job {} claimed by {}", job_id, worker_id);
                    return Ok(Some(job));
                }
                None => {
                    warn!("Job {} listed under '{}' has no stored data", job_id, key);
                    let _: i64 = conn.lrem(&processing, 1, &raw_id).await?;
                }
            }
        }

        Ok(None)
    }

    async fn complete(&self, job_id: Uuid) -> Result<(), JobQueueError> {
        let mut conn = self.get_connection().await?;
        let job = self.require_job(&mut conn, job_id).await?;

        let _: i64 = conn
            .lrem(self.list_key(&job.key, "processing"), 1, job_id.to_string())
            .await?;
        let _: i64 = conn.del(self.job_key(job_id)).await?;
        self.incr_stat(&mut conn, "completed").await?;

        debug!("Job {} completed", job_id);
        Ok(())
    }

    async fn fail(&self, job_id: Uuid, error_message: String) -> Result<Job, JobQueueError> {
        let mut conn = self.get_connection().await?;
        let mut job = self.require_job(&mut conn, job_id).await?;

        let _: i64 = conn
            .lrem(self.list_key(&job.key, "processing"), 1, job_id.to_string())
            .await?;

        match job.record_failure(error_message, Utc::now()) {
            JobStatus::Retrying => {
                self.store_job(&mut conn, &job).await?;
                let _: () = conn
                    .zadd(self.list_key(&job.key, "delayed"), job_id.to_string(), job.run_at.timestamp_millis())
                    .await?;
                self.incr_stat(&mut conn, "retried").await?;
            }
            _ => {
                self.store_job(&mut conn, &job).await?;
                let _: () = conn
                    .lpush(self.list_key(&job.key, "failed"), job_id.to_string())
                    .await?;
                self.incr_stat(&mut conn, "failed").await?;
                warn!("Job {} exhausted its retries and was moved to the failed list", job_id);
            }
        }

        Ok(job)
    }

    async fn get_job(&self, job_id: Uuid) -> Result<Option<Job>, JobQueueError> {
        let mut conn = self.get_connection().await?;
        self.load_job(&mut conn, job_id).await
    }

    async fn failed_jobs(&self, key: &str) -> Result<Vec<Job>, JobQueueError> {
        let mut conn = self.get_connection().await?;
        let ids: Vec<String> = conn.lrange(self.list_key(key, "failed"), 0, -1).await?;

        let mut jobs = Vec::with_capacity(ids.len());
        for raw_id in ids {
            let job = match Uuid::parse_str(&raw_id) {
                Ok(job_id) => self.load_job(&mut conn, job_id).await?,
                Err(_) => None,
            };

            match job {
                Some(job) => jobs.push(job),
                None => {
                    // The hash was removed outside the queue; drop the id so
                    // stats and health stop counting it.
                    let _: i64 = conn.lrem(self.list_key(key, "failed"), 1, &raw_id).await?;
                    warn!("Removed dead job '{}' from '{}': its stored data is gone", raw_id, key);
                }
            }
        }

        Ok(jobs)
    }

    async fn retry_failed(&self, job_id: Uuid) -> Result<Job, JobQueueError> {
        let mut conn = self.get_connection().await?;
        let mut job = self.require_job(&mut conn, job_id).await?;

        if job.status != JobStatus::Failed {
            return Err(JobQueueError::InvalidStatusTransition {
                from: format!("{:?}", job.status),
                to: format!("{:?}", JobStatus::Queued),
            });
        }

        let removed: i64 = conn
            .lrem(self.list_key(&job.key, "failed"), 1, job_id.to_string())
            .await?;
        if removed == 0 {
            return Err(JobQueueError::JobNotFound(job_id.to_string()));
        }

        job.requeue(Utc::now());
        self.store_job(&mut conn, &job).await?;
        let _: () = conn
            .lpush(self.list_key(&job.key, "pending"), job_id.to_string())
            .await?;

        info!("Job {} re-queued from the failed list", job_id);
        Ok(job)
    }

    async fn recover_stalled(&self, stalled_before: DateTime<Utc>) -> Result<u64, JobQueueError> {
        let mut conn = self.get_connection().await?;
        let keys: Vec<String> = conn.smembers(self.keys_set()).await?;
        let now = Utc::now();

        let mut recovered = 0;
        for key in keys {
            let processing = self.list_key(&key, "processing");
            let ids: Vec<String> = conn.lrange(&processing, 0, -1).await?;

            for raw_id in ids {
                let job = match Uuid::parse_str(&raw_id) {
                    Ok(job_id) => self.load_job(&mut conn, job_id).await?,
                    Err(_) => None,
                };
                let Some(mut job) = job else {
                    warn!("Dropping processing entry '{}' under '{}' with no stored job", raw_id, key);
                    let _: i64 = conn.lrem(&processing, 1, &raw_id).await?;
                    continue;
                };

                if !job.is_stalled(stalled_before) {
                    continue;
                }

                // Another worker may settle or recover the job meanwhile; only
                // the caller that removes the id requeues it.
                let removed: i64 = conn.lrem(&processing, 1, &raw_id).await?;
                if removed == 0 {
                    continue;
                }

                job.release(now);
                self.store_job(&mut conn, &job).await?;
                let _: () = conn.rpush(self.list_key(&key, "pending"), &raw_id).await?;
                recovered += 1;
            }
        }

        if recovered > 0 {
            warn!("Recovered {} stalled job(s) from processing lists", recovered);
        }
        Ok(recovered)
    }

    async fn stats(&self) -> Result<QueueStats, JobQueueError> {
        let mut conn = self.get_connection().await?;
        let keys: Vec<String> = conn.smembers(self.keys_set()).await?;

        let mut stats = QueueStats::default();
        for key in keys {
            let queued: u64 = conn.llen(self.list_key(&key, "pending")).await?;
            let processing: u64 = conn.llen(self.list_key(&key, "processing")).await?;
            let delayed: u64 = conn.zcard(self.list_key(&key, "delayed")).await?;
            let failed: u64 = conn.llen(self.list_key(&key, "failed")).await?;
            stats.queued_jobs += queued;
            stats.processing_jobs += processing;
            stats.delayed_jobs += delayed;
            stats.failed_jobs += failed;
        }

        let completed: Option<u64> = conn.hget(self.stats_key(), "completed").await?;
        let retried: Option<u64> = conn.hget(self.stats_key(), "retried").await?;
        stats.completed_total = completed.unwrap_or(0);
        stats.retried_total = retried.unwrap_or(0);

        Ok(stats.with_health())
    }
}
