use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use shared_models::error::StoreError;

use crate::models::Notification;
use crate::services::store::NotificationStore;

#[derive(Default)]
pub struct InMemoryNotificationStore {
    notifications: RwLock<Vec<Notification>>,
}

impl InMemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.notifications.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.notifications.read().await.is_empty()
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn append(&self, notification: Notification) -> Result<Notification, StoreError> {
        self.notifications.write().await.push(notification.clone());
        Ok(notification)
    }

    async fn list_recent(&self, user: Uuid, limit: usize) -> Result<Vec<Notification>, StoreError> {
        let notifications = self.notifications.read().await;

        // Later appends win ties on `created_at`.
        let mut recent: Vec<Notification> = notifications
            .iter()
            .rev()
            .filter(|n| n.user == user)
            .cloned()
            .collect();
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        recent.truncate(limit);

        Ok(recent)
    }

    async fn mark_read(&self, user: Uuid, id: Uuid) -> Result<Option<Notification>, StoreError> {
        let mut notifications = self.notifications.write().await;

        Ok(notifications
            .iter_mut()
            .find(|n| n.id == id && n.user == user)
            .map(|n| {
                n.read = true;
                n.clone()
            }))
    }
}
