use thiserror::Error;

#[derive(Error, Debug)]
pub enum MailError {
    #[error("Failed to send mail: {0}")]
    SendFailed(String),

    #[error("Invalid mail configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Templating error: {0}")]
    TemplatingError(String),
}

impl From<tera::Error> for MailError {
    fn from(err: tera::Error) -> Self {
        // tera nests the useful part of the message in the source chain
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(inner) = source {
            message.push_str(": ");
            message.push_str(&inner.to_string());
            source = inner.source();
        }
        MailError::TemplatingError(message)
    }
}
