use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::services::queue::JobQueue;
use crate::{Job, JobQueueError, JobStatus, QueueStats};

#[derive(Default)]
struct QueueContents {
    jobs: HashMap<Uuid, Job>,
    pending: HashMap<String, VecDeque<Uuid>>,
    failed: HashMap<String, Vec<Uuid>>,
    completed_total: u64,
    retried_total: u64,
}

impl QueueContents {
    fn job_mut(&mut self, job_id: Uuid) -> Result<&mut Job, JobQueueError> {
        self.jobs
            .get_mut(&job_id)
            .ok_or_else(|| JobQueueError::JobNotFound(job_id.to_string()))
    }
}

/// Process-local queue. Jobs do not survive a restart.
#[derive(Default)]
pub struct InMemoryJobQueue {
    state: Mutex<QueueContents>,
}

impl InMemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

fn ensure_transition(job: &Job, target: JobStatus) -> Result<(), JobQueueError> {
    if job.status.can_transition_to(&target) {
        Ok(())
    } else {
        Err(JobQueueError::InvalidStatusTransition {
            from: format!("{:?}", job.status),
            to: format!("{:?}", target),
        })
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn enqueue(&self, job: &Job) -> Result<(), JobQueueError> {
        let mut state = self.state.lock().await;
        state.pending.entry(job.key.clone()).or_default().push_back(job.job_id);
        state.jobs.insert(job.job_id, job.clone());
        debug!("Job {} enqueued under '{}'", job.job_id, job.key);
        Ok(())
    }

    async fn claim(&self, keys: &[String], worker_id: &str) -> Result<Option<Job>, JobQueueError> {
        let now = Utc::now();
        let mut state = self.state.lock().await;
        let QueueContents { jobs, pending, .. } = &mut *state;

        for key in keys {
            let Some(queue) = pending.get_mut(key) else { continue };
            let due = queue
                .iter()
                .position(|id| jobs.get(id).is_some_and(|job| job.is_due(now)));

            if let Some(position) = due {
                let Some(job_id) = queue.remove(position) else { continue };
                let Some(job) = jobs.get_mut(&job_id) else { continue };
                job.mark_processing(worker_id, now);
                return Ok(Some(job.clone()));
            }
        }

        Ok(None)
    }

    async fn complete(&self, job_id: Uuid) -> Result<(), JobQueueError> {
        let mut state = self.state.lock().await;
        let job = state.job_mut(job_id)?;
        ensure_transition(job, JobStatus::Completed)?;
        state.jobs.remove(&job_id);
        state.completed_total += 1;
        Ok(())
    }

    async fn fail(&self, job_id: Uuid, error_message: String) -> Result<Job, JobQueueError> {
        let mut state = self.state.lock().await;
        let job = state.job_mut(job_id)?;
        ensure_transition(job, JobStatus::Failed)?;

        let status = job.record_failure(error_message, Utc::now());
        let job = job.clone();

        match status {
            JobStatus::Retrying => {
                state.retried_total += 1;
                state.pending.entry(job.key.clone()).or_default().push_back(job_id);
            }
            _ => {
                warn!("Job {} exhausted its retries and was moved to the failed list", job_id);
                state.failed.entry(job.key.clone()).or_default().push(job_id);
            }
        }

        Ok(job)
    }

    async fn get_job(&self, job_id: Uuid) -> Result<Option<Job>, JobQueueError> {
        Ok(self.state.lock().await.jobs.get(&job_id).cloned())
    }

    async fn failed_jobs(&self, key: &str) -> Result<Vec<Job>, JobQueueError> {
        let state = self.state.lock().await;
        Ok(state
            .failed
            .get(key)
            .map(|ids| ids.iter().filter_map(|id| state.jobs.get(id).cloned()).collect())
            .unwrap_or_default())
    }

    async fn retry_failed(&self, job_id: Uuid) -> Result<Job, JobQueueError> {
        let mut state = self.state.lock().await;
        let job = state.job_mut(job_id)?;
        if job.status != JobStatus::Failed {
            return Err(JobQueueError::InvalidStatusTransition {
                from: format!("{:?}", job.status),
                to: format!("{:?}", JobStatus::Queued),
            });
        }

        job.requeue(Utc::now());
        let job = job.clone();

        if let Some(ids) = state.failed.get_mut(&job.key) {
            ids.retain(|id| *id != job_id);
        }
        state.pending.entry(job.key.clone()).or_default().push_back(job_id);

        Ok(job)
    }

    async fn recover_stalled(&self, stalled_before: DateTime<Utc>) -> Result<u64, JobQueueError> {
        let now = Utc::now();
        let mut state = self.state.lock().await;
        let QueueContents { jobs, pending, .. } = &mut *state;

        let mut recovered = 0;
        for job in jobs.values_mut().filter(|job| job.is_stalled(stalled_before)) {
            job.release(now);
            pending.entry(job.key.clone()).or_default().push_front(job.job_id);
            recovered += 1;
        }

        Ok(recovered)
    }

    async fn stats(&self) -> Result<QueueStats, JobQueueError> {
        let now = Utc::now();
        let state = self.state.lock().await;
        let mut stats = QueueStats {
            completed_total: state.completed_total,
            retried_total: state.retried_total,
            ..QueueStats::default()
        };

        for job in state.jobs.values() {
            match job.status {
                JobStatus::Queued | JobStatus::Retrying if job.is_due(now) => stats.queued_jobs += 1,
                JobStatus::Queued | JobStatus::Retrying => stats.delayed_jobs += 1,
                JobStatus::Processing => stats.processing_jobs += 1,
                JobStatus::Failed => stats.failed_jobs += 1,
                JobStatus::Completed => {}
            }
        }

        Ok(stats.with_health())
    }
}
