#![allow(dead_code)]

use std::sync::Arc;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use appointment_cell::*;
use job_queue_cell::{InMemoryJobQueue, Job, JobProducerService, JobQueue, JobQueueError, QueueStats, RetryPolicy};
use notification_cell::{InMemoryNotificationStore, Notification, NotificationDispatcher, NotificationStore};
use shared_models::error::StoreError;
use shared_utils::test_utils::{InMemoryUserStore, TestUser};
use shared_utils::DateFormatter;

/// 2030-05-01 10:00 UTC
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 5, 1, 10, 0, 0).unwrap()
}

pub fn at(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 5, 1, hour, minute, second).unwrap()
}

pub fn request(provider: &TestUser, date: &str) -> BookAppointmentRequest {
    BookAppointmentRequest {
        provider_id: provider.id,
        date: date.to_string(),
    }
}

pub struct Harness {
    pub clock: Arc<FixedClock>,
    pub users: Arc<InMemoryUserStore>,
    pub store: Arc<InMemoryAppointmentStore>,
    pub notifications: Arc<InMemoryNotificationStore>,
    pub queue: Arc<InMemoryJobQueue>,
    pub scheduling: Arc<AppointmentSchedulingService>,
    pub cancellation: Arc<AppointmentCancellationService>,
    pub listing: Arc<AppointmentListingService>,
    pub provider: TestUser,
    pub other_provider: TestUser,
    pub customer: TestUser,
    pub other_customer: TestUser,
}

pub struct HarnessBuilder {
    notification_store: Option<Arc<dyn NotificationStore>>,
    job_queue: Option<Arc<dyn JobQueue>>,
}

impl HarnessBuilder {
    pub fn notification_store(mut self, store: Arc<dyn NotificationStore>) -> Self {
        self.notification_store = Some(store);
        self
    }

    pub fn job_queue(mut self, queue: Arc<dyn JobQueue>) -> Self {
        self.job_queue = Some(queue);
        self
    }

    pub fn build(self) -> Harness {
        let provider = TestUser::provider("Diego");
        let other_provider = TestUser::provider("Robson");
        let customer = TestUser::customer("Elton");
        let other_customer = TestUser::customer("Mayk");

        let clock = Arc::new(FixedClock::new(start_time()));
        let users = Arc::new(InMemoryUserStore::with_users(&[
            &provider,
            &other_provider,
            &customer,
            &other_customer,
        ]));
        let store = Arc::new(InMemoryAppointmentStore::new(users.clone()));
        let notifications = Arc::new(InMemoryNotificationStore::new());
        let queue = Arc::new(InMemoryJobQueue::new());

        let notification_store: Arc<dyn NotificationStore> =
            self
            .notification_store
            .unwrap_or_else(|| notifications.clone() as Arc<dyn NotificationStore>);
        let job_queue: Arc<dyn JobQueue> = self
            .job_queue
            .unwrap_or_else(|| queue.clone() as Arc<dyn JobQueue>);

        let dispatcher = Arc::new(NotificationDispatcher::new(notification_store, users.clone()));
        let producer = Arc::new(JobProducerService::new(job_queue, RetryPolicy::default()));

        let scheduling = Arc::new(AppointmentSchedulingService::new(
            store.clone(),
            users.clone(),
            dispatcher,
            clock.clone(),
            DateFormatter::new("pt_BR"),
        ));
        let cancellation = Arc::new(AppointmentCancellationService::new(store.clone(), producer, clock.clone()));
        let listing = Arc::new(AppointmentListingService::new(store.clone(), clock.clone()));

        Harness {
            clock,
            users,
            store,
            notifications,
            queue,
            scheduling,
            cancellation,
            listing,
            provider,
            other_provider,
            customer,
            other_customer,
        }
    }
}

impl Harness {
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder {
            notification_store: None,
            job_queue: None,
        }
    }

    pub fn new() -> Self {
        Self::builder().build()
    }

    pub async fn book(&self, customer: &TestUser, provider: &TestUser, date: &str) -> Result<Appointment, AppointmentError> {
        self.scheduling.book_appointment(customer.id, request(provider, date)).await
    }

    pub async fn queued_mail_jobs(&self) -> Vec<Job> {
        let keys = vec![CANCELLATION_MAIL_JOB.to_string()];
        let mut jobs = Vec::new();
        while let Some(job) = self.queue.claim(&keys, "test").await.unwrap() {
            jobs.push(job);
        }
        jobs
    }
}

pub struct FailingNotificationStore;

#[async_trait]
impl NotificationStore for FailingNotificationStore {
    async fn append(&self, _notification: Notification) -> Result<Notification, StoreError> {
        Err(StoreError::Unavailable("document store offline".to_string()))
    }

    async fn list_recent(&self, _user: Uuid, _limit: usize) -> Result<Vec<Notification>, StoreError> {
        Err(StoreError::Unavailable("document store offline".to_string()))
    }

    async fn mark_read(&self, _user: Uuid, _id: Uuid) -> Result<Option<Notification>, StoreError> {
        Err(StoreError::Unavailable("document store offline".to_string()))
    }
}

pub struct FailingJobQueue;

fn offline() -> JobQueueError {
    JobQueueError::QueueError("queue offline".to_string())
}

#[async_trait]
impl JobQueue for FailingJobQueue {
    async fn enqueue(&self, _job: &Job) -> Result<(), JobQueueError> {
        Err(offline())
    }

    async fn claim(&self, _keys: &[String], _worker_id: &str) -> Result<Option<Job>, JobQueueError> {
        Err(offline())
    }

    async fn complete(&self, _job_id: Uuid) -> Result<(), JobQueueError> {
        Err(offline())
    }

    async fn fail(&self, _job_id: Uuid, _error_message: String) -> Result<Job, JobQueueError> {
        Err(offline())
    }

    async fn get_job(&self, _job_id: Uuid) -> Result<Option<Job>, JobQueueError> {
        Err(offline())
    }

    async fn failed_jobs(&self, _key: &str) -> Result<Vec<Job>, JobQueueError> {
        Err(offline())
    }

    async fn retry_failed(&self, _job_id: Uuid) -> Result<Job, JobQueueError> {
        Err(offline())
    }

    async fn recover_stalled(&self, _stalled_before: DateTime<Utc>) -> Result<u64, JobQueueError> {
        Err(offline())
    }

    async fn stats(&self) -> Result<QueueStats, JobQueueError> {
        Err(offline())
    }
}
