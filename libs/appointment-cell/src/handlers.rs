use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::Json,
    Extension,
};
use tracing::{error, info};
use uuid::Uuid;

use shared_models::{auth::User, error::AppError};

use crate::models::{
    Appointment, AppointmentError, AppointmentListItem, BookAppointmentRequest, ListAppointmentsQuery,
};
use crate::router::AppointmentState;

fn map_appointment_error(e: AppointmentError) -> AppError {
    match e {
        AppointmentError::InvalidProvider
        | AppointmentError::PastDateRejected
        | AppointmentError::CancellationWindowExpired => AppError::BadRequest(e.to_string()),
        AppointmentError::ProviderCannotBook | AppointmentError::Forbidden => AppError::Forbidden(e.to_string()),
        AppointmentError::SlotUnavailable | AppointmentError::AlreadyCancelled => AppError::Conflict(e.to_string()),
        AppointmentError::NotFound => AppError::NotFound(e.to_string()),
        AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
        AppointmentError::Store(store_error) => {
            error!("Appointment store failure: {}", store_error);
            AppError::Database("Appointment storage is unavailable".to_string())
        }
    }
}

pub async fn book_appointment(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
    payload: Result<Json<BookAppointmentRequest>, JsonRejection>,
) -> Result<Json<Appointment>, AppError> {
    let Json(request) = payload.map_err(|rejection| AppError::ValidationError(rejection.body_text()))?;
    let requester_id = user.user_id()?;
    info!("Booking request from user {} for provider {}", requester_id, request.provider_id);

    let appointment = state
        .scheduling
        .book_appointment(requester_id, request)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(appointment))
}

pub async fn list_appointments(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
    Query(query): Query<ListAppointmentsQuery>,
) -> Result<Json<Vec<AppointmentListItem>>, AppError> {
    let requester_id = user.user_id()?;

    let appointments = state
        .listing
        .list_appointments(requester_id, query.page)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(appointments))
}

pub async fn cancel_appointment(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Appointment>, AppError> {
    let requester_id = user.user_id()?;
    info!("Cancellation request for appointment {} from user {}", appointment_id, requester_id);

    let appointment = state
        .cancellation
        .cancel_appointment(requester_id, appointment_id)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(appointment))
}
