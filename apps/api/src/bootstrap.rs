use std::sync::Arc;
use anyhow::Context;
use tracing::{info, warn};

use appointment_cell::{
    AppointmentCancellationService, AppointmentListingService, AppointmentSchedulingService,
    AppointmentState, AvailabilityStore, Clock, SupabaseAppointmentStore, SystemClock,
};
use job_queue_cell::{
    InMemoryJobQueue, JobProducerService, JobQueue, JobWorkerService, QueueState, RedisJobQueue,
    RetryPolicy, WorkerConfig,
};
use mail_cell::{CancellationMailHandler, HttpMailTransport, LogMailTransport, MailTransport, Mailer};
use notification_cell::{NotificationDispatcher, NotificationState, NotificationStore, SupabaseNotificationStore};
use shared_config::AppConfig;
use shared_database::{SupabaseClient, SupabaseUserStore};
use shared_models::users::UserStore;
use shared_utils::DateFormatter;

/// External collaborators the services are built on.
pub struct Backends {
    pub users: Arc<dyn UserStore>,
    pub appointments: Arc<dyn AvailabilityStore>,
    pub notifications: Arc<dyn NotificationStore>,
    pub queue: Arc<dyn JobQueue>,
    pub mail: Arc<dyn MailTransport>,
    pub clock: Arc<dyn Clock>,
}

impl Backends {
    /// Supabase stores, Redis queue when `REDIS_URL` is set and the HTTP
    /// mail API when `MAIL_API_URL` is set.
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let supabase = Arc::new(SupabaseClient::new(config));

        let queue: Arc<dyn JobQueue> = match config.redis_url.as_deref() {
            Some(url) if config.is_queue_durable() => Arc::new(
                RedisJobQueue::new(url)
                    .await
                    .context("failed to connect the job queue to Redis")?,
            ),
            _ => {
                warn!("REDIS_URL not set; jobs are kept in memory and lost on restart");
                Arc::new(InMemoryJobQueue::new())
            }
        };

        let mail: Arc<dyn MailTransport> = if config.is_mail_configured() {
            Arc::new(HttpMailTransport::from_config(config)?)
        } else {
            warn!("MAIL_API_URL not set; mails will only be logged");
            Arc::new(LogMailTransport)
        };

        Ok(Self {
            users: Arc::new(SupabaseUserStore::new(supabase.clone())),
            appointments: Arc::new(SupabaseAppointmentStore::new(supabase.clone())),
            notifications: Arc::new(SupabaseNotificationStore::new(supabase)),
            queue,
            mail,
            clock: Arc::new(SystemClock),
        })
    }
}

/// Wired services plus the background worker that sends queued mail.
pub struct Application {
    pub config: Arc<AppConfig>,
    pub scheduling: Arc<AppointmentSchedulingService>,
    pub cancellation: Arc<AppointmentCancellationService>,
    pub listing: Arc<AppointmentListingService>,
    pub notifications: Arc<NotificationDispatcher>,
    pub producer: Arc<JobProducerService>,
    pub worker: JobWorkerService,
}

impl Application {
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let backends = Backends::from_config(&config).await?;
        Self::assemble(config, backends)
    }

    pub fn assemble(config: AppConfig, backends: Backends) -> anyhow::Result<Self> {
        let formatter = DateFormatter::new(&config.app_locale);

        let notifications = Arc::new(NotificationDispatcher::new(
            backends.notifications,
            backends.users.clone(),
        ));
        let producer = Arc::new(JobProducerService::new(
            backends.queue.clone(),
            RetryPolicy::from_app_config(&config),
        ));

        let scheduling = Arc::new(AppointmentSchedulingService::new(
            backends.appointments.clone(),
            backends.users,
            notifications.clone(),
            backends.clock.clone(),
            formatter,
        ));
        let cancellation = Arc::new(AppointmentCancellationService::new(
            backends.appointments.clone(),
            producer.clone(),
            backends.clock.clone(),
        ));
        let listing = Arc::new(AppointmentListingService::new(backends.appointments, backends.clock));

        let mailer = Arc::new(
            Mailer::new(backends.mail, &config.mail_from).context("failed to load mail templates")?,
        );
        let worker = JobWorkerService::new(WorkerConfig::from_app_config(&config), backends.queue)
            .with_handler(Arc::new(CancellationMailHandler::new(mailer, formatter)));

        info!(
            "Application assembled (locale {}, {} worker loop(s), handlers {:?})",
            config.app_locale,
            config.worker_concurrency,
            worker.registered_keys()
        );

        Ok(Self {
            config: Arc::new(config),
            scheduling,
            cancellation,
            listing,
            notifications,
            producer,
            worker,
        })
    }

    pub fn appointment_state(&self) -> AppointmentState {
        AppointmentState {
            config: self.config.clone(),
            scheduling: self.scheduling.clone(),
            cancellation: self.cancellation.clone(),
            listing: self.listing.clone(),
        }
    }

    pub fn notification_state(&self) -> NotificationState {
        NotificationState {
            config: self.config.clone(),
            dispatcher: self.notifications.clone(),
        }
    }

    pub fn queue_state(&self) -> QueueState {
        QueueState {
            config: self.config.clone(),
            producer: self.producer.clone(),
        }
    }
}
