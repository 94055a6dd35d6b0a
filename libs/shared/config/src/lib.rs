use std::env;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub supabase_jwt_secret: String,
    pub redis_url: Option<String>,
    pub mail_api_url: Option<String>,
    pub mail_api_token: Option<String>,
    pub mail_from: String,
    pub app_locale: String,
    pub server_port: u16,
    pub worker_concurrency: u32,
    pub job_max_retries: u32,
    pub job_backoff_seconds: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_service_key: env::var("SUPABASE_SERVICE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            redis_url: optional_var("REDIS_URL"),
            mail_api_url: optional_var("MAIL_API_URL"),
            mail_api_token: optional_var("MAIL_API_TOKEN"),
            mail_from: env::var("MAIL_FROM")
                .unwrap_or_else(|_| {
                    warn!("MAIL_FROM not set, using default");
                    "Agenda <noreply@agenda.local>".to_string()
                }),
            app_locale: env::var("APP_LOCALE").unwrap_or_else(|_| "pt_BR".to_string()),
            server_port: parsed_var("SERVER_PORT", 3000),
            worker_concurrency: parsed_var("WORKER_CONCURRENCY", 2),
            job_max_retries: parsed_var("JOB_MAX_RETRIES", 3),
            job_backoff_seconds: parsed_var("JOB_BACKOFF_SECONDS", 5),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_service_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    pub fn is_queue_durable(&self) -> bool {
        self.redis_url.as_deref().is_some_and(|url| !url.is_empty())
    }

    pub fn is_mail_configured(&self) -> bool {
        self.mail_api_url.as_deref().is_some_and(|url| !url.is_empty())
    }
}

fn optional_var(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => {
            warn!("{} not set", name);
            None
        }
    }
}

fn parsed_var<T: FromStr + Copy + std::fmt::Display>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value '{}', using default {}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}
