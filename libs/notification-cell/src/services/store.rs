use async_trait::async_trait;
use uuid::Uuid;

use shared_models::error::StoreError;

use crate::models::Notification;

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn append(&self, notification: Notification) -> Result<Notification, StoreError>;

    /// Newest first, at most `limit` rows.
    async fn list_recent(&self, user: Uuid, limit: usize) -> Result<Vec<Notification>, StoreError>;

    /// Flags the notification as read when it belongs to `user`.
    async fn mark_read(&self, user: Uuid, id: Uuid) -> Result<Option<Notification>, StoreError>;
}
