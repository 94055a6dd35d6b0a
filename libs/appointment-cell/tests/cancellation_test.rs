mod common;

use std::sync::Arc;
use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use appointment_cell::*;
use job_queue_cell::{JobProducerService, JobStatus, RetryPolicy};
use shared_models::error::StoreError;

use common::{at, FailingJobQueue, Harness};

#[tokio::test]
async fn test_cancel_sets_cancelled_at_and_queues_mail() {
    let h = Harness::new();
    let appointment = h.book(&h.customer, &h.provider, "2030-05-01T15:00:00Z").await.unwrap();

    let cancelled = h
        .cancellation
        .cancel_appointment(h.customer.id, appointment.id)
        .await
        .expect("cancellation should succeed");

    assert_eq!(cancelled.cancelled_at, Some(at(10, 0, 0)));
    assert_eq!(h.store.get(appointment.id).await.unwrap().cancelled_at, Some(at(10, 0, 0)));

    let jobs = h.queued_mail_jobs().await;
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].key, CANCELLATION_MAIL_JOB);
    assert_eq!(jobs[0].status, JobStatus::Processing);

    let payload: CancellationMailPayload = serde_json::from_value(jobs[0].data.clone()).unwrap();
    assert_eq!(payload.appointment.appointment.id, appointment.id);
    assert_eq!(payload.appointment.provider.name, "Diego");
    assert_eq!(payload.appointment.provider.email, "diego@example.com");
    assert_eq!(payload.appointment.user.name, "Elton");
    assert_eq!(payload.appointment.appointment.cancelled_at, Some(at(10, 0, 0)));
}

#[tokio::test]
async fn test_cancellation_window_boundary() {
    let h = Harness::new();
    let appointment = h.book(&h.customer, &h.provider, "2030-05-01T13:00:00Z").await.unwrap();

    h.clock.set(at(11, 0, 1));
    assert_matches!(
        h.cancellation.cancel_appointment(h.customer.id, appointment.id).await,
        Err(AppointmentError::CancellationWindowExpired)
    );

    h.clock.set(at(11, 0, 0));
    assert_matches!(
        h.cancellation.cancel_appointment(h.customer.id, appointment.id).await,
        Err(AppointmentError::CancellationWindowExpired)
    );

    h.clock.set(at(10, 59, 59));
    assert!(h.cancellation.cancel_appointment(h.customer.id, appointment.id).await.is_ok());
}

#[tokio::test]
async fn test_cancel_at_twelve_fifty_nine_but_not_thirteen_oh_one() {
    let h = Harness::new();
    let early = h.book(&h.customer, &h.provider, "2030-05-01T15:00:00Z").await.unwrap();
    let late = h.book(&h.customer, &h.other_provider, "2030-05-01T15:00:00Z").await.unwrap();

    h.clock.set(at(12, 59, 0));
    assert!(h.cancellation.cancel_appointment(h.customer.id, early.id).await.is_ok());

    h.clock.set(at(13, 1, 0));
    assert_matches!(
        h.cancellation.cancel_appointment(h.customer.id, late.id).await,
        Err(AppointmentError::CancellationWindowExpired)
    );
    assert!(h.store.get(late.id).await.unwrap().cancelled_at.is_none());
}

#[tokio::test]
async fn test_only_the_booking_customer_may_cancel() {
    let h = Harness::new();
    let appointment = h.book(&h.customer, &h.provider, "2030-05-01T15:00:00Z").await.unwrap();

    assert_matches!(
        h.cancellation.cancel_appointment(h.other_customer.id, appointment.id).await,
        Err(AppointmentError::Forbidden)
    );
    assert_matches!(
        h.cancellation.cancel_appointment(h.provider.id, appointment.id).await,
        Err(AppointmentError::Forbidden)
    );
    assert!(h.queued_mail_jobs().await.is_empty());
}

#[tokio::test]
async fn test_unknown_appointment_is_not_found() {
    let h = Harness::new();

    assert_matches!(
        h.cancellation.cancel_appointment(h.customer.id, Uuid::new_v4()).await,
        Err(AppointmentError::NotFound)
    );
}

#[tokio::test]
async fn test_double_cancel_is_rejected() {
    let h = Harness::new();
    let appointment = h.book(&h.customer, &h.provider, "2030-05-01T15:00:00Z").await.unwrap();

    h.cancellation.cancel_appointment(h.customer.id, appointment.id).await.unwrap();
    let first_cancelled_at = h.store.get(appointment.id).await.unwrap().cancelled_at;

    h.clock.set(at(10, 30, 0));
    assert_matches!(
        h.cancellation.cancel_appointment(h.customer.id, appointment.id).await,
        Err(AppointmentError::AlreadyCancelled)
    );

    assert_eq!(h.store.get(appointment.id).await.unwrap().cancelled_at, first_cancelled_at);
    assert_eq!(h.queued_mail_jobs().await.len(), 1);
}

/// Yields before each lookup the way a network round trip would, so two
/// joined cancellations both read the appointment before either writes.
struct RoundTripStore {
    inner: Arc<InMemoryAppointmentStore>,
}

#[async_trait]
impl AvailabilityStore for RoundTripStore {
    async fn find_active_slot(&self, provider_id: Uuid, date: DateTime<Utc>) -> Result<Option<Appointment>, StoreError> {
        self.inner.find_active_slot(provider_id, date).await
    }

    async fn create(&self, appointment: Appointment) -> Result<Appointment, StoreError> {
        self.inner.create(appointment).await
    }

    async fn cancel(&self, id: Uuid, cancelled_at: DateTime<Utc>) -> Result<Option<Appointment>, StoreError> {
        self.inner.cancel(id, cancelled_at).await
    }

    async fn find_with_participants(&self, id: Uuid) -> Result<Option<AppointmentDetails>, StoreError> {
        tokio::task::yield_now().await;
        self.inner.find_with_participants(id).await
    }

    async fn list_active_for_user(&self, user_id: Uuid, limit: u32, offset: u32) -> Result<Vec<AppointmentDetails>, StoreError> {
        self.inner.list_active_for_user(user_id, limit, offset).await
    }
}

#[tokio::test]
async fn test_concurrent_double_cancel_succeeds_once() {
    let h = Harness::new();
    let appointment = h.book(&h.customer, &h.provider, "2030-05-01T15:00:00Z").await.unwrap();

    let service = AppointmentCancellationService::new(
        Arc::new(RoundTripStore { inner: h.store.clone() }),
        Arc::new(JobProducerService::new(h.queue.clone(), RetryPolicy::default())),
        h.clock.clone(),
    );

    let (first, second) = tokio::join!(
        service.cancel_appointment(h.customer.id, appointment.id),
        service.cancel_appointment(h.customer.id, appointment.id),
    );

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|outcome| matches!(outcome, Err(AppointmentError::AlreadyCancelled))));
    assert_eq!(h.queued_mail_jobs().await.len(), 1);
}

#[tokio::test]
async fn test_cancellation_survives_queue_outage() {
    let h = Harness::builder().job_queue(Arc::new(FailingJobQueue)).build();
    let appointment = h.book(&h.customer, &h.provider, "2030-05-01T15:00:00Z").await.unwrap();

    let cancelled = h.cancellation.cancel_appointment(h.customer.id, appointment.id).await;

    assert!(cancelled.is_ok());
    assert!(h.store.get(appointment.id).await.unwrap().cancelled_at.is_some());
}
