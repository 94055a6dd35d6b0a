use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_models::error::StoreError;
use shared_models::users::Contact;

/// Job key of the mail sent to a provider when a customer cancels.
pub const CANCELLATION_MAIL_JOB: &str = "CancellationMail";

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub provider_id: Uuid,
    /// Start of the booked hour.
    pub date: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn new(user_id: Uuid, provider_id: Uuid, date: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            provider_id,
            date,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.cancelled_at.is_none()
    }

    pub fn is_past(&self, now: DateTime<Utc>) -> bool {
        self.date < now
    }

    /// Cancellation stays open until `window` before the appointment; the
    /// boundary instant itself is already closed.
    pub fn is_cancelable(&self, now: DateTime<Utc>, window: Duration) -> bool {
        now < self.date - window
    }

    pub fn occupies(&self, provider_id: Uuid, date: DateTime<Utc>) -> bool {
        self.is_active() && self.provider_id == provider_id && self.date == date
    }
}

/// An appointment with both participants' contact data, as carried in the
/// cancellation mail job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentDetails {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub provider: Contact,
    pub user: Contact,
}

/// Payload of a `CancellationMail` job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CancellationMailPayload {
    pub appointment: AppointmentDetails,
}

// ==============================================================================
// REQUEST / RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub provider_id: Uuid,
    pub date: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidatedBooking {
    pub provider_id: Uuid,
    pub date: DateTime<Utc>,
}

impl BookAppointmentRequest {
    pub fn validate(&self) -> Result<ValidatedBooking, AppointmentError> {
        if self.provider_id.is_nil() {
            return Err(AppointmentError::ValidationError("provider_id is required".to_string()));
        }

        let date = parse_request_date(&self.date)?;

        Ok(ValidatedBooking {
            provider_id: self.provider_id,
            date,
        })
    }
}

/// Accepts RFC 3339 timestamps and naive `YYYY-MM-DDTHH:MM[:SS]` values,
/// the latter read as UTC.
pub fn parse_request_date(raw: &str) -> Result<DateTime<Utc>, AppointmentError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppointmentError::ValidationError("date is required".to_string()));
    }

    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Ok(date.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| AppointmentError::ValidationError(format!("date '{}' is not a valid ISO-8601 timestamp", raw)))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListAppointmentsQuery {
    pub page: Option<u32>,
}

/// One row of a customer's agenda.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentListItem {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub provider: Contact,
    pub past: bool,
    pub cancelable: bool,
}

// ==============================================================================
// RULES
// ==============================================================================

#[derive(Debug, Clone, Copy)]
pub struct AppointmentRules {
    pub cancellation_window: Duration,
    pub page_size: u32,
}

impl Default for AppointmentRules {
    fn default() -> Self {
        Self {
            cancellation_window: Duration::hours(2),
            page_size: 20,
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("You can only create appointments with providers")]
    InvalidProvider,

    #[error("Providers cannot book appointments as customers")]
    ProviderCannotBook,

    #[error("Past dates are not permitted")]
    PastDateRejected,

    #[error("Appointment date is not available")]
    SlotUnavailable,

    #[error("Appointment not found")]
    NotFound,

    #[error("You don't have permission to cancel this appointment")]
    Forbidden,

    #[error("You can only cancel appointments 2 hours in advance")]
    CancellationWindowExpired,

    #[error("Appointment is already cancelled")]
    AlreadyCancelled,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_request_accepts_rfc3339_and_naive_dates() {
        let provider_id = Uuid::new_v4();
        let expected = Utc.with_ymd_and_hms(2030, 5, 1, 15, 32, 0).unwrap();

        for raw in ["2030-05-01T15:32:00Z", "2030-05-01T12:32:00-03:00", "2030-05-01T15:32:00", "2030-05-01T15:32"] {
            let request = BookAppointmentRequest { provider_id, date: raw.to_string() };
            assert_eq!(request.validate().unwrap().date, expected, "input {}", raw);
        }
    }

    #[test]
    fn test_request_rejects_garbage() {
        let provider_id = Uuid::new_v4();
        for raw in ["", "tomorrow", "2030-13-01T10:00:00"] {
            let request = BookAppointmentRequest { provider_id, date: raw.to_string() };
            assert!(matches!(request.validate(), Err(AppointmentError::ValidationError(_))));
        }

        let request = BookAppointmentRequest { provider_id: Uuid::nil(), date: "2030-05-01T15:00:00Z".into() };
        assert!(matches!(request.validate(), Err(AppointmentError::ValidationError(_))));
    }

    #[test]
    fn test_cancelable_boundary() {
        let now = Utc.with_ymd_and_hms(2030, 5, 1, 10, 0, 0).unwrap();
        let window = Duration::hours(2);
        let at = |h, m, s| Appointment::new(Uuid::new_v4(), Uuid::new_v4(), Utc.with_ymd_and_hms(2030, 5, 1, h, m, s).unwrap(), now);

        assert!(at(12, 0, 1).is_cancelable(now, window));
        assert!(!at(12, 0, 0).is_cancelable(now, window));
        assert!(!at(11, 59, 59).is_cancelable(now, window));
    }

    #[test]
    fn test_details_serialize_flat() {
        let now = Utc::now();
        let details = AppointmentDetails {
            appointment: Appointment::new(Uuid::new_v4(), Uuid::new_v4(), now, now),
            provider: Contact { name: "Diego".into(), email: "diego@example.com".into() },
            user: Contact { name: "Elton".into(), email: "elton@example.com".into() },
        };

        let value = serde_json::to_value(&details).unwrap();
        assert_eq!(value["provider"]["name"], "Diego");
        assert!(value["date"].is_string());

        let back: AppointmentDetails = serde_json::from_value(value).unwrap();
        assert_eq!(back, details);
    }
}
