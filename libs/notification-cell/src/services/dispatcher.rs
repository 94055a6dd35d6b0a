use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use shared_models::users::UserStore;

use crate::models::{Notification, NotificationError, NOTIFICATION_LIST_LIMIT};
use crate::services::store::NotificationStore;

pub struct NotificationDispatcher {
    store: Arc<dyn NotificationStore>,
    users: Arc<dyn UserStore>,
}

impl NotificationDispatcher {
    pub fn new(store: Arc<dyn NotificationStore>, users: Arc<dyn UserStore>) -> Self {
        Self { store, users }
    }

    #[instrument(skip(self, content))]
    pub async fn notify(&self, user: Uuid, content: &str) -> Result<Notification, NotificationError> {
        if content.trim().is_empty() {
            return Err(NotificationError::ValidationError("content must not be empty".to_string()));
        }

        let notification = self.store.append(Notification::new(user, content)).await?;
        info!("Notification {} delivered to user {}", notification.id, user);

        Ok(notification)
    }

    /// Latest notifications of a provider. Customers have no inbox.
    pub async fn list_notifications(&self, requester_id: Uuid) -> Result<Vec<Notification>, NotificationError> {
        if !self.users.is_provider(requester_id).await? {
            return Err(NotificationError::NotAProvider);
        }

        let notifications = self.store.list_recent(requester_id, NOTIFICATION_LIST_LIMIT).await?;
        debug!("Loaded {} notifications for provider {}", notifications.len(), requester_id);

        Ok(notifications)
    }

    pub async fn mark_as_read(
        &self,
        requester_id: Uuid,
        notification_id: Uuid,
    ) -> Result<Notification, NotificationError> {
        self.store
            .mark_read(requester_id, notification_id)
            .await?
            .ok_or(NotificationError::NotFound)
    }
}
