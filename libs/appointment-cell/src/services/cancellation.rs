use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

use job_queue_cell::JobProducerService;

use crate::models::{
    Appointment, AppointmentError, AppointmentRules, CancellationMailPayload, CANCELLATION_MAIL_JOB,
};
use crate::services::clock::Clock;
use crate::services::store::AvailabilityStore;

pub struct AppointmentCancellationService {
    store: Arc<dyn AvailabilityStore>,
    producer: Arc<JobProducerService>,
    clock: Arc<dyn Clock>,
    rules: AppointmentRules,
}

impl AppointmentCancellationService {
    pub fn new(
        store: Arc<dyn AvailabilityStore>,
        producer: Arc<JobProducerService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_rules(store, producer, clock, AppointmentRules::default())
    }

    pub fn with_rules(
        store: Arc<dyn AvailabilityStore>,
        producer: Arc<JobProducerService>,
        clock: Arc<dyn Clock>,
        rules: AppointmentRules,
    ) -> Self {
        Self {
            store,
            producer,
            clock,
            rules,
        }
    }

    /// Cancels a customer's own appointment and queues the provider mail.
    ///
    /// The mail is sent out of band. Once the cancellation is stored, a
    /// failure to queue the mail is logged and the call still succeeds.
    #[instrument(skip(self))]
    pub async fn cancel_appointment(
        &self,
        requester_id: Uuid,
        appointment_id: Uuid,
    ) -> Result<Appointment, AppointmentError> {
        let mut details = self
            .store
            .find_with_participants(appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound)?;

        if details.appointment.user_id != requester_id {
            return Err(AppointmentError::Forbidden);
        }

        if !details.appointment.is_active() {
            return Err(AppointmentError::AlreadyCancelled);
        }

        let now = self.clock.now();
        if !details.appointment.is_cancelable(now, self.rules.cancellation_window) {
            return Err(AppointmentError::CancellationWindowExpired);
        }

        let cancelled = self
            .store
            .cancel(appointment_id, now)
            .await?
            .ok_or(AppointmentError::AlreadyCancelled)?;
        details.appointment = cancelled.clone();

        info!("Appointment {} cancelled by {}", cancelled.id, requester_id);

        let payload = CancellationMailPayload { appointment: details };
        match self.producer.enqueue(CANCELLATION_MAIL_JOB, &payload).await {
            Ok(job) => info!("Cancellation mail for appointment {} queued as job {}", cancelled.id, job.job_id),
            Err(e) => error!(
                "Appointment {} was cancelled but its cancellation mail could not be queued: {}",
                cancelled.id, e
            ),
        }

        Ok(cancelled)
    }
}
