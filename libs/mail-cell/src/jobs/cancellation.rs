use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use appointment_cell::{CancellationMailPayload, CANCELLATION_MAIL_JOB};
use job_queue_cell::{Job, JobHandler, JobQueueError};
use shared_utils::DateFormatter;

use crate::mailer::Mailer;

const TEMPLATE: &str = "cancellation";

#[derive(Debug, Serialize)]
struct CancellationContext<'a> {
    provider: &'a str,
    user: &'a str,
    date: String,
}

/// Tells a provider that a customer cancelled their appointment.
pub struct CancellationMailHandler {
    mailer: Arc<Mailer>,
    formatter: DateFormatter,
}

impl CancellationMailHandler {
    pub fn new(mailer: Arc<Mailer>, formatter: DateFormatter) -> Self {
        Self { mailer, formatter }
    }

    fn subject(&self) -> &'static str {
        if self.formatter.is_portuguese() {
            "Agendamento cancelado"
        } else {
            "Appointment cancelled"
        }
    }

    fn locale(&self) -> &'static str {
        if self.formatter.is_portuguese() {
            "pt_BR"
        } else {
            "en_US"
        }
    }
}

#[async_trait]
impl JobHandler for CancellationMailHandler {
    fn key(&self) -> &str {
        CANCELLATION_MAIL_JOB
    }

    async fn handle(&self, job: &Job) -> Result<(), JobQueueError> {
        let payload: CancellationMailPayload = serde_json::from_value(job.data.clone())?;
        let details = &payload.appointment;

        let context = CancellationContext {
            provider: &details.provider.name,
            user: &details.user.name,
            date: self.formatter.format_long(details.appointment.date),
        };

        self.mailer
            .send_mail(
                &details.provider.mailbox(),
                self.subject(),
                TEMPLATE,
                self.locale(),
                &context,
            )
            .await
            .map_err(|e| JobQueueError::handler_failed(CANCELLATION_MAIL_JOB, e))?;

        info!("Cancellation mail for appointment {} sent to provider {}", details.appointment.id, details.provider.email);
        Ok(())
    }
}
