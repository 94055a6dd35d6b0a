use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;

/// A registered account. `provider` marks accounts that offer services.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub provider: bool,
}

impl UserProfile {
    pub fn contact(&self) -> Contact {
        Contact {
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Contact {
    pub name: String,
    pub email: String,
}

impl Contact {
    /// `Name <email>` form used in mail headers.
    pub fn mailbox(&self) -> String {
        format!("{} <{}>", self.name, self.email)
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, id: Uuid) -> Result<Option<UserProfile>, StoreError>;

    /// Returns the user only when it carries the provider role.
    async fn find_provider(&self, id: Uuid) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.find_user(id).await?.filter(|user| user.provider))
    }

    async fn is_provider(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.find_provider(id).await?.is_some())
    }
}
