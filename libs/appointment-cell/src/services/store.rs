use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use shared_models::error::StoreError;

use crate::models::{Appointment, AppointmentDetails};

/// Persistence for appointments. Implementations guarantee that at most one
/// active appointment exists per provider and hour; a `create` that would
/// break this fails with `StoreError::Conflict`.
#[async_trait]
pub trait AvailabilityStore: Send + Sync {
    async fn find_active_slot(
        &self,
        provider_id: Uuid,
        date: DateTime<Utc>,
    ) -> Result<Option<Appointment>, StoreError>;

    async fn create(&self, appointment: Appointment) -> Result<Appointment, StoreError>;

    /// Sets `cancelled_at` on an active appointment and returns the stored
    /// row. Returns `None` when the appointment was already cancelled, so of
    /// several concurrent calls exactly one succeeds.
    async fn cancel(&self, id: Uuid, cancelled_at: DateTime<Utc>) -> Result<Option<Appointment>, StoreError>;

    async fn find_with_participants(&self, id: Uuid) -> Result<Option<AppointmentDetails>, StoreError>;

    /// Active appointments booked by `user_id`, ordered by date.
    async fn list_active_for_user(
        &self,
        user_id: Uuid,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<AppointmentDetails>, StoreError>;
}
