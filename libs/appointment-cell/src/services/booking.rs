use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use notification_cell::NotificationDispatcher;
use shared_models::error::StoreError;
use shared_models::users::UserStore;
use shared_utils::DateFormatter;

use crate::models::{Appointment, AppointmentError, BookAppointmentRequest};
use crate::services::clock::{start_of_hour, Clock};
use crate::services::store::AvailabilityStore;

pub struct AppointmentSchedulingService {
    store: Arc<dyn AvailabilityStore>,
    users: Arc<dyn UserStore>,
    notifications: Arc<NotificationDispatcher>,
    clock: Arc<dyn Clock>,
    formatter: DateFormatter,
}

impl AppointmentSchedulingService {
    pub fn new(
        store: Arc<dyn AvailabilityStore>,
        users: Arc<dyn UserStore>,
        notifications: Arc<NotificationDispatcher>,
        clock: Arc<dyn Clock>,
        formatter: DateFormatter,
    ) -> Self {
        Self {
            store,
            users,
            notifications,
            clock,
            formatter,
        }
    }

    /// Books the hour containing `request.date` with the requested provider.
    ///
    /// The provider is notified in-app once the appointment is stored; a
    /// failed notification is logged and does not undo the booking.
    #[instrument(skip(self, request), fields(provider_id = %request.provider_id))]
    pub async fn book_appointment(
        &self,
        requester_id: Uuid,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let booking = request.validate()?;

        let provider = self.users.find_provider(booking.provider_id).await?;
        if provider.is_none() {
            return Err(AppointmentError::InvalidProvider);
        }

        let requester = self.users.find_user(requester_id).await?.ok_or_else(|| {
            AppointmentError::ValidationError(format!("requester {} is not a registered user", requester_id))
        })?;
        if requester.provider {
            return Err(AppointmentError::ProviderCannotBook);
        }

        let now = self.clock.now();
        let hour_start = start_of_hour(booking.date);
        if hour_start <= now {
            debug!("Rejecting booking for {} (now {})", hour_start, now);
            return Err(AppointmentError::PastDateRejected);
        }

        if self.store.find_active_slot(booking.provider_id, hour_start).await?.is_some() {
            return Err(AppointmentError::SlotUnavailable);
        }

        let appointment = Appointment::new(requester_id, booking.provider_id, hour_start, now);
        let appointment = self.store.create(appointment).await.map_err(|e| match e {
            StoreError::Conflict(_) => AppointmentError::SlotUnavailable,
            other => AppointmentError::Store(other),
        })?;

        info!(
            "Appointment {} booked by {} with provider {} at {}",
            appointment.id, requester_id, appointment.provider_id, appointment.date
        );

        let content = format!(
            "New booking from {} for {}",
            requester.name,
            self.formatter.format_long(appointment.date)
        );
        if let Err(e) = self.notifications.notify(appointment.provider_id, &content).await {
            warn!("Failed to notify provider {} about appointment {}: {}", appointment.provider_id, appointment.id, e);
        }

        Ok(appointment)
    }
}
