use std::sync::Arc;
use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use mockall::{mock, predicate, Sequence};
use serde_json::json;
use tokio::time::{sleep, timeout, Duration};
use uuid::Uuid;

use appointment_cell::{Appointment, AppointmentDetails, CancellationMailPayload, CANCELLATION_MAIL_JOB};
use job_queue_cell::*;
use mail_cell::*;
use shared_models::users::Contact;
use shared_utils::DateFormatter;

mock! {
    pub Transport {}

    #[async_trait]
    impl MailTransport for Transport {
        async fn send(&self, message: &MailMessage) -> Result<(), MailError>;
    }
}

fn payload() -> CancellationMailPayload {
    let date = Utc.with_ymd_and_hms(2030, 5, 1, 15, 0, 0).unwrap();
    let now = Utc.with_ymd_and_hms(2030, 5, 1, 10, 0, 0).unwrap();
    let mut appointment = Appointment::new(Uuid::new_v4(), Uuid::new_v4(), date, now);
    appointment.cancelled_at = Some(now);

    CancellationMailPayload {
        appointment: AppointmentDetails {
            appointment,
            provider: Contact { name: "Diego".into(), email: "diego@example.com".into() },
            user: Contact { name: "Elton".into(), email: "elton@example.com".into() },
        },
    }
}

fn job_for(payload: &CancellationMailPayload, max_retries: u32) -> Job {
    let policy = RetryPolicy { max_retries, base_delay_ms: 0, max_delay_ms: 0 };
    Job::new(CANCELLATION_MAIL_JOB, serde_json::to_value(payload).unwrap(), policy)
}

fn handler_with(transport: MockTransport, locale: &str) -> CancellationMailHandler {
    let mailer = Mailer::new(Arc::new(transport), "Agenda <noreply@agenda.test>").unwrap();
    CancellationMailHandler::new(Arc::new(mailer), DateFormatter::new(locale))
}

#[tokio::test]
async fn test_sends_portuguese_mail_to_provider() {
    let mut transport = MockTransport::new();
    transport
        .expect_send()
        .withf(|message: &MailMessage| {
            message.to == "Diego <diego@example.com>"
                && message.from == "Agenda <noreply@agenda.test>"
                && message.subject == "Agendamento cancelado"
                && message.html.contains("Olá, Diego")
                && message.html.contains("Elton")
                && message.html.contains("dia 01 de maio, às 15:00h")
        })
        .times(1)
        .returning(|_| Ok(()));

    let handler = handler_with(transport, "pt_BR");
    assert_eq!(handler.key(), "CancellationMail");

    handler.handle(&job_for(&payload(), 3)).await.expect("mail should be sent");
}

#[tokio::test]
async fn test_sends_english_mail_when_configured() {
    let mut transport = MockTransport::new();
    transport
        .expect_send()
        .withf(|message: &MailMessage| {
            message.subject == "Appointment cancelled" && message.html.contains("May 01, at 15:00h")
        })
        .times(1)
        .returning(|_| Ok(()));

    let handler = handler_with(transport, "en_US");
    handler.handle(&job_for(&payload(), 3)).await.unwrap();
}

#[tokio::test]
async fn test_transport_failure_fails_the_job() {
    let mut transport = MockTransport::new();
    transport
        .expect_send()
        .times(1)
        .returning(|_| Err(MailError::SendFailed("relay refused".to_string())));

    let handler = handler_with(transport, "pt_BR");

    assert_matches!(
        handler.handle(&job_for(&payload(), 3)).await,
        Err(JobQueueError::HandlerFailed { key, reason }) if key == "CancellationMail" && reason.contains("relay refused")
    );
}

#[tokio::test]
async fn test_malformed_payload_is_rejected_without_sending() {
    let mut transport = MockTransport::new();
    transport.expect_send().times(0);

    let handler = handler_with(transport, "pt_BR");
    let job = Job::new(CANCELLATION_MAIL_JOB, json!({ "appointment": { "id": 1 } }), RetryPolicy::default());

    assert_matches!(handler.handle(&job).await, Err(JobQueueError::SerializationError(_)));
}

#[tokio::test]
async fn test_worker_retries_mail_until_delivered() {
    let mut transport = MockTransport::new();
    let mut sequence = Sequence::new();
    transport
        .expect_send()
        .times(2)
        .in_sequence(&mut sequence)
        .returning(|_| Err(MailError::SendFailed("temporary failure".to_string())));
    transport
        .expect_send()
        .with(predicate::function(|message: &MailMessage| message.to == "Diego <diego@example.com>"))
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|_| Ok(()));

    let queue = Arc::new(InMemoryJobQueue::new());
    let worker_config = WorkerConfig {
        worker_id: "mail-test".to_string(),
        max_concurrent_jobs: 1,
        job_timeout_seconds: 5,
        poll_interval_ms: 10,
        health_check_interval_seconds: 1,
        graceful_shutdown_timeout_seconds: 2,
    };
    let worker = JobWorkerService::new(worker_config, queue.clone())
        .with_handler(Arc::new(handler_with(transport, "pt_BR")));

    let job = job_for(&payload(), 3);
    queue.enqueue(&job).await.unwrap();

    let running = worker.clone();
    let handle = tokio::spawn(async move { running.start().await });

    timeout(Duration::from_secs(5), async {
        while queue.get_job(job.job_id).await.unwrap().is_some() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("job should complete after retries");

    assert_eq!(queue.stats().await.unwrap().retried_total, 2);

    worker.shutdown();
    timeout(Duration::from_secs(5), handle).await.unwrap().unwrap().unwrap();
}
