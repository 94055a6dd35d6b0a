use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_models::error::StoreError;

/// Most recent notifications returned by a listing.
pub const NOTIFICATION_LIST_LIMIT: usize = 20;

/// In-app message addressed to a provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub content: String,
    /// Recipient user id.
    pub user: Uuid,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(user: Uuid, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            user,
            read: false,
            created_at: Utc::now(),
        }
    }
}

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Only providers can load notifications")]
    NotAProvider,

    #[error("Notification not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
