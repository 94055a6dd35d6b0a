use async_trait::async_trait;
use reqwest::{header, Client};
use tracing::{debug, info};

use shared_config::AppConfig;

use crate::error::MailError;
use crate::models::MailMessage;

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError>;
}

/// Delivers through an HTTP mail API that accepts the message as JSON.
#[derive(Debug)]
pub struct HttpMailTransport {
    client: Client,
    api_url: String,
    api_token: Option<String>,
}

impl HttpMailTransport {
    pub fn new(api_url: &str, api_token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.to_string(),
            api_token,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, MailError> {
        let api_url = config
            .mail_api_url
            .as_deref()
            .ok_or_else(|| MailError::InvalidConfiguration("MAIL_API_URL is not set".to_string()))?;
        Ok(Self::new(api_url, config.mail_api_token.clone()))
    }
}

#[async_trait]
impl MailTransport for HttpMailTransport {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        debug!("Posting mail '{}' to {}", message.subject, self.api_url);

        let mut request = self
            .client
            .post(&self.api_url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(message);

        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(MailError::SendFailed(format!(
                "Mail API returned non-success status: {}. Body: {}",
                status, error_body
            )));
        }

        info!("Mail '{}' accepted for {}", message.subject, message.to);
        Ok(())
    }
}

/// Writes messages to the log instead of sending them.
#[derive(Debug, Default)]
pub struct LogMailTransport;

#[async_trait]
impl MailTransport for LogMailTransport {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            "Mail transport not configured; message logged only"
        );
        debug!("{}", message.html);
        Ok(())
    }
}
