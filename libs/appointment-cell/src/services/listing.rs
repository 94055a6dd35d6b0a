use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::models::{AppointmentError, AppointmentListItem, AppointmentRules};
use crate::services::clock::Clock;
use crate::services::store::AvailabilityStore;

/// Paged view of a customer's upcoming and past active appointments.
pub struct AppointmentListingService {
    store: Arc<dyn AvailabilityStore>,
    clock: Arc<dyn Clock>,
    rules: AppointmentRules,
}

impl AppointmentListingService {
    pub fn new(store: Arc<dyn AvailabilityStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            rules: AppointmentRules::default(),
        }
    }

    pub async fn list_appointments(
        &self,
        user_id: Uuid,
        page: Option<u32>,
    ) -> Result<Vec<AppointmentListItem>, AppointmentError> {
        let page = page.unwrap_or(1);
        if page == 0 {
            return Err(AppointmentError::ValidationError("page starts at 1".to_string()));
        }

        let limit = self.rules.page_size;
        let offset = (page - 1).saturating_mul(limit);
        let rows = self.store.list_active_for_user(user_id, limit, offset).await?;
        debug!("Listing page {} for user {}: {} appointment(s)", page, user_id, rows.len());

        let now = self.clock.now();
        Ok(rows
            .into_iter()
            .map(|details| AppointmentListItem {
                past: details.appointment.is_past(now),
                cancelable: details.appointment.is_cancelable(now, self.rules.cancellation_window),
                appointment: details.appointment,
                provider: details.provider,
            })
            .collect())
    }
}
