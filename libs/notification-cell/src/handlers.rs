use axum::{
    extract::{Path, State},
    response::Json,
    Extension,
};
use tracing::error;
use uuid::Uuid;

use shared_models::{auth::User, error::AppError};

use crate::models::{Notification, NotificationError};
use crate::router::NotificationState;

fn map_notification_error(e: NotificationError) -> AppError {
    match e {
        NotificationError::NotAProvider => AppError::Forbidden(e.to_string()),
        NotificationError::NotFound => AppError::NotFound(e.to_string()),
        NotificationError::ValidationError(msg) => AppError::ValidationError(msg),
        NotificationError::Store(store_error) => {
            error!("Notification store failure: {}", store_error);
            store_error.into()
        }
    }
}

pub async fn list_notifications(
    State(state): State<NotificationState>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let requester_id = user.user_id()?;

    let notifications = state
        .dispatcher
        .list_notifications(requester_id)
        .await
        .map_err(map_notification_error)?;

    Ok(Json(notifications))
}

pub async fn mark_notification_read(
    State(state): State<NotificationState>,
    Extension(user): Extension<User>,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<Notification>, AppError> {
    let requester_id = user.user_id()?;

    let notification = state
        .dispatcher
        .mark_as_read(requester_id, notification_id)
        .await
        .map_err(map_notification_error)?;

    Ok(Json(notification))
}
