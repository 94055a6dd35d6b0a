use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::MailError;
use crate::models::MailMessage;
use crate::renderer::MailRenderer;
use crate::transport::MailTransport;

/// Renders a template and hands the message to the configured transport.
pub struct Mailer {
    transport: Arc<dyn MailTransport>,
    renderer: MailRenderer,
    from: String,
}

impl Mailer {
    pub fn new(transport: Arc<dyn MailTransport>, from: &str) -> Result<Self, MailError> {
        Ok(Self {
            transport,
            renderer: MailRenderer::new()?,
            from: from.to_string(),
        })
    }

    #[instrument(skip(self, context))]
    pub async fn send_mail<C: Serialize + Sync>(
        &self,
        to: &str,
        subject: &str,
        template: &str,
        locale: &str,
        context: &C,
    ) -> Result<(), MailError> {
        let html = self.renderer.render(template, locale, context)?;
        let message = MailMessage {
            from: self.from.clone(),
            to: to.to_string(),
            subject: subject.to_string(),
            html,
        };

        debug!("Sending '{}' mail to {}", template, to);
        self.transport.send(&message).await
    }
}
