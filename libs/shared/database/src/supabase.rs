use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;
use shared_models::error::StoreError;

/// Thin PostgREST client authenticated with the service key.
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    service_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_base_url(&config.supabase_url, &config.supabase_service_key)
    }

    pub fn with_base_url(base_url: &str, service_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
        }
    }

    fn get_headers(&self) -> Result<HeaderMap, StoreError> {
        let mut headers = HeaderMap::new();

        let api_key = HeaderValue::from_str(&self.service_key)
            .map_err(|e| StoreError::Unavailable(format!("Invalid service key: {}", e)))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.service_key))
            .map_err(|e| StoreError::Unavailable(format!("Invalid service key: {}", e)))?;

        headers.insert("apikey", api_key);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        // Writes echo the stored rows back.
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T, StoreError>
    where T: DeserializeOwned {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut req = self.client.request(method, &url)
            .headers(self.get_headers()?);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("API error ({}): {}", status, error_text);

            return Err(match status {
                StatusCode::CONFLICT if is_unique_violation(&error_text) => StoreError::Conflict(error_text),
                StatusCode::CONFLICT => StoreError::Rejected(error_text),
                _ => StoreError::Unavailable(format!("API error ({}): {}", status, error_text)),
            });
        }

        response.json::<T>().await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }

    /// Fetches rows and decodes the first one, if any.
    pub async fn fetch_one<T>(&self, path: &str) -> Result<Option<T>, StoreError>
    where T: DeserializeOwned {
        let rows: Vec<Value> = self.request(Method::GET, path, None).await?;

        rows.into_iter()
            .next()
            .map(|row| serde_json::from_value(row).map_err(|e| StoreError::Decode(e.to_string())))
            .transpose()
    }

    pub async fn fetch_all<T>(&self, path: &str) -> Result<Vec<T>, StoreError>
    where T: DeserializeOwned {
        let rows: Vec<Value> = self.request(Method::GET, path, None).await?;

        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(|e| StoreError::Decode(e.to_string())))
            .collect()
    }

    /// Sends a write (`POST`/`PATCH`) and decodes the single returned row.
    pub async fn write_one<T>(&self, method: Method, path: &str, body: Value) -> Result<T, StoreError>
    where T: DeserializeOwned {
        self.write_optional(method, path, body)
            .await?
            .ok_or_else(|| StoreError::Decode("write returned no rows".to_string()))
    }

    /// Like `write_one`, but a write whose filter matched no row yields `None`.
    pub async fn write_optional<T>(&self, method: Method, path: &str, body: Value) -> Result<Option<T>, StoreError>
    where T: DeserializeOwned {
        let rows: Vec<Value> = self.request(method, path, Some(body)).await?;

        rows.into_iter()
            .next()
            .map(|row| serde_json::from_value(row).map_err(|e| StoreError::Decode(e.to_string())))
            .transpose()
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}

/// PostgREST reports the Postgres SQLSTATE in `code`; 23505 is `unique_violation`.
fn is_unique_violation(body: &str) -> bool {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|error| error.get("code").and_then(Value::as_str).map(|code| code == "23505"))
        .unwrap_or(false)
}
