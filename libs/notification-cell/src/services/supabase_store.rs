use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use shared_database::SupabaseClient;
use shared_models::error::StoreError;

use crate::models::Notification;
use crate::services::store::NotificationStore;

pub struct SupabaseNotificationStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseNotificationStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl NotificationStore for SupabaseNotificationStore {
    async fn append(&self, notification: Notification) -> Result<Notification, StoreError> {
        debug!("Storing notification for user {}", notification.user);

        let body = json!({
            "id": notification.id,
            "content": notification.content,
            "user": notification.user,
            "read": notification.read,
            "created_at": notification.created_at,
        });

        self.supabase
            .write_one(Method::POST, "/rest/v1/notifications", body)
            .await
    }

    async fn list_recent(&self, user: Uuid, limit: usize) -> Result<Vec<Notification>, StoreError> {
        let path = format!(
            "/rest/v1/notifications?user=eq.{}&order=created_at.desc&limit={}",
            user, limit
        );
        self.supabase.fetch_all(&path).await
    }

    async fn mark_read(&self, user: Uuid, id: Uuid) -> Result<Option<Notification>, StoreError> {
        let path = format!("/rest/v1/notifications?id=eq.{}&user=eq.{}", id, user);
        let rows: Vec<Notification> = self
            .supabase
            .request(Method::PATCH, &path, Some(json!({ "read": true })))
            .await?;

        Ok(rows.into_iter().next())
    }
}
