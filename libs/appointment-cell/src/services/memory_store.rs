use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use shared_models::error::StoreError;
use shared_models::users::UserStore;

use crate::models::{Appointment, AppointmentDetails};
use crate::services::store::AvailabilityStore;

/// Map-backed store. The slot check and the insert share one write lock.
pub struct InMemoryAppointmentStore {
    appointments: RwLock<HashMap<Uuid, Appointment>>,
    users: Arc<dyn UserStore>,
}

impl InMemoryAppointmentStore {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self {
            appointments: RwLock::new(HashMap::new()),
            users,
        }
    }

    pub async fn get(&self, id: Uuid) -> Option<Appointment> {
        self.appointments.read().await.get(&id).cloned()
    }

    pub async fn active_count(&self, provider_id: Uuid, date: DateTime<Utc>) -> usize {
        self.appointments
            .read()
            .await
            .values()
            .filter(|a| a.occupies(provider_id, date))
            .count()
    }

    async fn with_participants(&self, appointment: Appointment) -> Result<AppointmentDetails, StoreError> {
        let provider = self
            .users
            .find_user(appointment.provider_id)
            .await?
            .ok_or_else(|| StoreError::Decode(format!("provider {} missing", appointment.provider_id)))?;
        let user = self
            .users
            .find_user(appointment.user_id)
            .await?
            .ok_or_else(|| StoreError::Decode(format!("user {} missing", appointment.user_id)))?;

        Ok(AppointmentDetails {
            appointment,
            provider: provider.contact(),
            user: user.contact(),
        })
    }
}

#[async_trait]
impl AvailabilityStore for InMemoryAppointmentStore {
    async fn find_active_slot(
        &self,
        provider_id: Uuid,
        date: DateTime<Utc>,
    ) -> Result<Option<Appointment>, StoreError> {
        Ok(self
            .appointments
            .read()
            .await
            .values()
            .find(|a| a.occupies(provider_id, date))
            .cloned())
    }

    async fn create(&self, appointment: Appointment) -> Result<Appointment, StoreError> {
        let mut appointments = self.appointments.write().await;

        if appointments
            .values()
            .any(|a| a.occupies(appointment.provider_id, appointment.date))
        {
            return Err(StoreError::Conflict(format!(
                "provider {} already booked at {}",
                appointment.provider_id, appointment.date
            )));
        }

        appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn cancel(&self, id: Uuid, cancelled_at: DateTime<Utc>) -> Result<Option<Appointment>, StoreError> {
        let mut appointments = self.appointments.write().await;

        match appointments.get_mut(&id) {
            Some(stored) if stored.is_active() => {
                stored.cancelled_at = Some(cancelled_at);
                stored.updated_at = cancelled_at;
                Ok(Some(stored.clone()))
            }
            Some(_) => Ok(None),
            None => Err(StoreError::Unavailable(format!("appointment {} does not exist", id))),
        }
    }

    async fn find_with_participants(&self, id: Uuid) -> Result<Option<AppointmentDetails>, StoreError> {
        let appointment = self.appointments.read().await.get(&id).cloned();

        match appointment {
            Some(appointment) => Ok(Some(self.with_participants(appointment).await?)),
            None => Ok(None),
        }
    }

    async fn list_active_for_user(
        &self,
        user_id: Uuid,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<AppointmentDetails>, StoreError> {
        let mut active: Vec<Appointment> = self
            .appointments
            .read()
            .await
            .values()
            .filter(|a| a.user_id == user_id && a.is_active())
            .cloned()
            .collect();
        active.sort_by_key(|a| a.date);

        let mut details = Vec::new();
        for appointment in active.into_iter().skip(offset as usize).take(limit as usize) {
            details.push(self.with_participants(appointment).await?);
        }

        Ok(details)
    }
}
