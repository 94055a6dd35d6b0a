use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, error, info, instrument, warn};

use crate::services::queue::{JobHandler, JobQueue};
use crate::{Job, JobQueueError, JobStatus, WorkerConfig};

/// Polls the queue for registered keys and runs each claimed job on its own task.
#[derive(Clone)]
pub struct JobWorkerService {
    worker_id: String,
    config: WorkerConfig,
    queue: Arc<dyn JobQueue>,
    handlers: Arc<HashMap<String, Arc<dyn JobHandler>>>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl JobWorkerService {
    pub fn new(config: WorkerConfig, queue: Arc<dyn JobQueue>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            worker_id: config.worker_id.clone(),
            config,
            queue,
            handlers: Arc::new(HashMap::new()),
            shutdown: Arc::new(shutdown),
        }
    }

    pub fn with_handler(mut self, handler: Arc<dyn JobHandler>) -> Self {
        let key = handler.key().to_string();
        Arc::make_mut(&mut self.handlers).insert(key, handler);
        self
    }

    pub fn registered_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.handlers.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Runs the polling loops until `shutdown` is called. Returns once every
    /// in-flight job has finished.
    #[instrument(skip(self), fields(worker_id = %self.worker_id))]
    pub async fn start(&self) -> Result<(), JobQueueError> {
        if self.handlers.is_empty() {
            warn!("Worker {} started without any job handlers", self.worker_id);
        }

        let stalled_before = chrono::Utc::now() - self.config.stalled_after();
        match self.queue.recover_stalled(stalled_before).await {
            Ok(0) => {}
            Ok(count) => info!("Worker {} re-queued {} stalled job(s)", self.worker_id, count),
            Err(e) => error!("Worker {} could not recover stalled jobs: {}", self.worker_id, e),
        }

        info!(
            "Starting worker {} with {} loop(s) for keys {:?}",
            self.worker_id,
            self.config.max_concurrent_jobs,
            self.registered_keys()
        );

        let mut handles = Vec::new();
        for i in 0..self.config.max_concurrent_jobs.max(1) {
            let worker = self.clone();
            let worker_name = format!("{}-{}", self.worker_id, i);
            handles.push(tokio::spawn(async move { worker.worker_loop(worker_name).await }));
        }

        let health_worker = self.clone();
        handles.push(tokio::spawn(async move { health_worker.health_check_loop().await }));

        for result in join_all(handles).await {
            if let Err(e) = result {
                error!("Worker task for {} ended abnormally: {}", self.worker_id, e);
            }
        }

        info!("Worker {} stopped", self.worker_id);
        Ok(())
    }

    /// Stops claiming new jobs. Loops finish the job they hold before exiting.
    pub fn shutdown(&self) {
        info!("Initiating graceful shutdown for worker {}", self.worker_id);
        self.shutdown.send_replace(true);
    }

    pub fn graceful_shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.config.graceful_shutdown_timeout_seconds)
    }

    async fn worker_loop(&self, worker_name: String) {
        debug!("Worker loop started: {}", worker_name);
        let keys = self.registered_keys();
        let mut shutdown = self.shutdown.subscribe();
        let idle = Duration::from_millis(self.config.poll_interval_ms);

        loop {
            if *shutdown.borrow() {
                debug!("Worker {} received shutdown signal", worker_name);
                break;
            }

            let pause = match self.queue.claim(&keys, &worker_name).await {
                Ok(Some(job)) => {
                    if let Err(e) = self.process_job(job, &worker_name).await {
                        error!("Worker {} failed to record job outcome: {}", worker_name, e);
                    }
                    continue;
                }
                Ok(None) => idle,
                Err(e) => {
                    error!("Worker {} failed to claim a job: {}", worker_name, e);
                    Duration::from_secs(5)
                }
            };

            tokio::select! {
                _ = sleep(pause) => {}
                _ = shutdown.changed() => {}
            }
        }

        debug!("Worker loop ended: {}", worker_name);
    }

    #[instrument(skip(self, job), fields(job_id = %job.job_id, key = %job.key))]
    async fn process_job(&self, job: Job, worker_name: &str) -> Result<(), JobQueueError> {
        info!(
            "Processing job {} (attempt {}/{}) with worker {}",
            job.job_id,
            job.retry_count + 1,
            job.max_retries() + 1,
            worker_name
        );

        let Some(handler) = self.handlers.get(&job.key).cloned() else {
            let reason = JobQueueError::NoHandler(job.key.clone()).to_string();
            return self.record_failure(&job, reason).await;
        };

        let job_timeout = Duration::from_secs(self.config.job_timeout_seconds);
        let task_job = job.clone();
        let mut task = tokio::spawn(async move { handler.handle(&task_job).await });

        let outcome = match timeout(job_timeout, &mut task).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(e))) => Err(e.to_string()),
            Ok(Err(join_error)) if join_error.is_panic() => {
                Err(format!("handler for '{}' panicked", job.key))
            }
            Ok(Err(join_error)) => Err(join_error.to_string()),
            Err(_) => {
                task.abort();
                Err(JobQueueError::WorkerTimeout {
                    timeout_seconds: self.config.job_timeout_seconds,
                }
                .to_string())
            }
        };

        match outcome {
            Ok(()) => {
                self.queue.complete(job.job_id).await?;
                info!("Job {} completed by {}", job.job_id, worker_name);
                Ok(())
            }
            Err(reason) => {
                let reason = JobQueueError::handler_failed(&job.key, reason).to_string();
                self.record_failure(&job, reason).await
            }
        }
    }

    async fn record_failure(&self, job: &Job, reason: String) -> Result<(), JobQueueError> {
        let updated = self.queue.fail(job.job_id, reason.clone()).await?;

        match updated.status {
            JobStatus::Retrying => warn!(
                "Job {} failed ({}); retry {}/{} scheduled for {}",
                job.job_id,
                reason,
                updated.retry_count,
                updated.max_retries(),
                updated.run_at
            ),
            _ => error!(
                "{}",
                JobQueueError::MaxRetriesExceeded {
                    job_id: job.job_id.to_string(),
                    max_retries: updated.max_retries(),
                }
            ),
        }

        Ok(())
    }

    async fn health_check_loop(&self) {
        let mut interval = tokio::time::interval(Duration::from_secs(
            self.config.health_check_interval_seconds.max(1),
        ));
        let mut shutdown = self.shutdown.subscribe();

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = interval.tick() => {}
                _ = shutdown.changed() => break,
            }

            match self.queue.stats().await {
                Ok(stats) if stats.failed_jobs > 0 => warn!(
                    "Queue health: {} queued, {} delayed, {} processing, {} failed",
                    stats.queued_jobs, stats.delayed_jobs, stats.processing_jobs, stats.failed_jobs
                ),
                Ok(stats) => debug!(
                    "Queue health: {} queued, {} delayed, {} processing, {} completed",
                    stats.queued_jobs, stats.delayed_jobs, stats.processing_jobs, stats.completed_total
                ),
                Err(e) => error!("Worker {} health check failed: {}", self.worker_id, e),
            }
        }
    }
}
