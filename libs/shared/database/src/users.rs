use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use shared_models::error::StoreError;
use shared_models::users::{UserProfile, UserStore};

use crate::supabase::SupabaseClient;

const USER_COLUMNS: &str = "id,name,email,provider";

pub struct SupabaseUserStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseUserStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl UserStore for SupabaseUserStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<UserProfile>, StoreError> {
        let path = format!("/rest/v1/users?id=eq.{}&select={}", id, USER_COLUMNS);
        self.supabase.fetch_one(&path).await
    }

    async fn find_provider(&self, id: Uuid) -> Result<Option<UserProfile>, StoreError> {
        let path = format!("/rest/v1/users?id=eq.{}&provider=eq.true&select={}", id, USER_COLUMNS);
        self.supabase.fetch_one(&path).await
    }
}
