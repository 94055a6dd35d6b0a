use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use shared_database::SupabaseClient;
use shared_models::error::StoreError;

use crate::models::{Appointment, AppointmentDetails};
use crate::services::store::AvailabilityStore;

/// Embeds both participants through the `provider_id` / `user_id` foreign keys.
const DETAILS_SELECT: &str = "*,provider:users!provider_id(name,email),user:users!user_id(name,email)";

/// PostgREST-backed store. Slot uniqueness is enforced by the partial unique
/// index on `(provider_id, date) where cancelled_at is null`.
pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAppointmentStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

fn encode_date(date: DateTime<Utc>) -> String {
    urlencoding::encode(&date.to_rfc3339_opts(SecondsFormat::Secs, true)).into_owned()
}

#[async_trait]
impl AvailabilityStore for SupabaseAppointmentStore {
    async fn find_active_slot(
        &self,
        provider_id: Uuid,
        date: DateTime<Utc>,
    ) -> Result<Option<Appointment>, StoreError> {
        let path = format!(
            "/rest/v1/appointments?provider_id=eq.{}&date=eq.{}&cancelled_at=is.null&limit=1",
            provider_id,
            encode_date(date)
        );
        self.supabase.fetch_one(&path).await
    }

    async fn create(&self, appointment: Appointment) -> Result<Appointment, StoreError> {
        debug!("Inserting appointment {} for provider {}", appointment.id, appointment.provider_id);

        let body = serde_json::to_value(&appointment).map_err(|e| StoreError::Decode(e.to_string()))?;
        self.supabase
            .write_one(Method::POST, "/rest/v1/appointments", body)
            .await
    }

    async fn cancel(&self, id: Uuid, cancelled_at: DateTime<Utc>) -> Result<Option<Appointment>, StoreError> {
        // The `cancelled_at` filter makes the update a compare-and-set.
        let path = format!("/rest/v1/appointments?id=eq.{}&cancelled_at=is.null", id);
        let body = json!({
            "cancelled_at": cancelled_at,
            "updated_at": cancelled_at,
        });

        self.supabase.write_optional(Method::PATCH, &path, body).await
    }

    async fn find_with_participants(&self, id: Uuid) -> Result<Option<AppointmentDetails>, StoreError> {
        let path = format!("/rest/v1/appointments?id=eq.{}&select={}", id, DETAILS_SELECT);
        self.supabase.fetch_one(&path).await
    }

    async fn list_active_for_user(
        &self,
        user_id: Uuid,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<AppointmentDetails>, StoreError> {
        let path = format!(
            "/rest/v1/appointments?user_id=eq.{}&cancelled_at=is.null&order=date.asc&limit={}&offset={}&select={}",
            user_id, limit, offset, DETAILS_SELECT
        );
        self.supabase.fetch_all(&path).await
    }
}
