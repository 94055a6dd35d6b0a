use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::json;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::StoreError;
use shared_models::users::{UserProfile, UserStore};

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_service_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_service_key: "test-service-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_service_key: self.supabase_service_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            redis_url: None,
            mail_api_url: None,
            mail_api_token: None,
            mail_from: "Agenda <noreply@agenda.test>".to_string(),
            app_locale: "pt_BR".to_string(),
            server_port: 0,
            worker_concurrency: 1,
            job_max_retries: 3,
            job_backoff_seconds: 0,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub provider: bool,
}

impl TestUser {
    pub fn new(name: &str, email: &str, provider: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            provider,
        }
    }

    pub fn customer(name: &str) -> Self {
        Self::new(name, &format!("{}@example.com", name.to_lowercase()), false)
    }

    pub fn provider(name: &str) -> Self {
        Self::new(name, &format!("{}@example.com", name.to_lowercase()), true)
    }

    pub fn to_profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            provider: self.provider,
        }
    }

    /// The authenticated principal as the auth middleware would insert it.
    pub fn to_user(&self) -> User {
        User {
            id: self.id.to_string(),
            email: Some(self.email.clone()),
            role: Some(if self.provider { "provider" } else { "customer" }.to_string()),
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id.to_string(),
            "email": user.email,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// User directory backed by a map, for tests and local runs.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<Uuid, UserProfile>>,
    unavailable: RwLock<bool>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: &[&TestUser]) -> Self {
        let store = Self::new();
        for user in users {
            store.insert(user.to_profile());
        }
        store
    }

    pub fn insert(&self, profile: UserProfile) {
        if let Ok(mut users) = self.users.write() {
            users.insert(profile.id, profile);
        }
    }

    /// Makes every subsequent lookup fail with `StoreError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        if let Ok(mut flag) = self.unavailable.write() {
            *flag = unavailable;
        }
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<UserProfile>, StoreError> {
        if self.unavailable.read().map(|flag| *flag).unwrap_or(false) {
            return Err(StoreError::Unavailable("user store offline".to_string()));
        }

        self.users
            .read()
            .map(|users| users.get(&id).cloned())
            .map_err(|_| StoreError::Unavailable("user store lock poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::{validate_token, TokenError};

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert_eq!(app_config.supabase_url, "http://localhost:54321");
        assert_eq!(app_config.supabase_service_key, "test-service-key");
        assert!(!app_config.supabase_jwt_secret.is_empty());
        assert!(!app_config.is_queue_durable());
    }

    #[test]
    fn test_user_creation() {
        let user = TestUser::provider("Diego");
        assert_eq!(user.email, "diego@example.com");
        assert!(user.provider);

        let principal = user.to_user();
        assert_eq!(principal.id, user.id.to_string());
        assert_eq!(principal.role.as_deref(), Some("provider"));
    }

    #[test]
    fn test_jwt_round_trip() {
        let user = TestUser::customer("Elton");
        let secret = "test-secret";
        let token = JwtTestUtils::create_test_token(&user, secret, Some(1));

        let validated = validate_token(&token, secret).expect("token should validate");
        assert_eq!(validated.id, user.id.to_string());
    }

    #[test]
    fn test_jwt_rejections() {
        let user = TestUser::customer("Elton");
        let secret = "test-secret";

        assert_eq!(
            validate_token(&JwtTestUtils::create_expired_token(&user, secret), secret).err(),
            Some(TokenError::Expired)
        );
        assert_eq!(
            validate_token(&JwtTestUtils::create_invalid_signature_token(&user), secret).err(),
            Some(TokenError::BadSignature)
        );
        assert_eq!(
            validate_token(&JwtTestUtils::create_malformed_token(), secret).err(),
            Some(TokenError::Malformed)
        );
        assert_eq!(validate_token("a.b", secret).err(), Some(TokenError::Malformed));
        assert_eq!(validate_token("a.b.c", "").err(), Some(TokenError::MissingSecret));
    }

    #[tokio::test]
    async fn test_in_memory_user_store() {
        let provider = TestUser::provider("Diego");
        let customer = TestUser::customer("Elton");
        let store = InMemoryUserStore::with_users(&[&provider, &customer]);

        assert!(store.is_provider(provider.id).await.unwrap());
        assert!(!store.is_provider(customer.id).await.unwrap());
        assert!(store.find_provider(customer.id).await.unwrap().is_none());

        store.set_unavailable(true);
        assert!(store.find_user(provider.id).await.is_err());
    }
}
