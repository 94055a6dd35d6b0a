use axum::{
    extract::{Path, State},
    response::Json,
    Extension,
};
use serde_json::{json, Value};
use tracing::{error, info};
use uuid::Uuid;

use shared_models::{auth::User, error::AppError};

use crate::router::QueueState;
use crate::JobQueueError;

const OPERATOR_ROLES: [&str; 2] = ["service_role", "admin"];

fn require_operator(user: &User) -> Result<(), AppError> {
    match user.role.as_deref() {
        Some(role) if OPERATOR_ROLES.contains(&role) => Ok(()),
        _ => Err(AppError::Forbidden("Queue administration requires an operator role".to_string())),
    }
}

fn map_queue_error(e: JobQueueError) -> AppError {
    match e {
        JobQueueError::JobNotFound(id) => AppError::NotFound(format!("Job {} not found", id)),
        JobQueueError::InvalidStatusTransition { .. } => AppError::Conflict(e.to_string()),
        JobQueueError::ValidationError(msg) => AppError::BadRequest(msg),
        other => {
            error!("Queue operation failed: {}", other);
            AppError::Internal("Queue operation failed".to_string())
        }
    }
}

/// Get queue statistics
pub async fn get_queue_stats(
    State(state): State<QueueState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    info!("Queue stats request from user: {}", user.id);

    let stats = state.producer.stats().await.map_err(map_queue_error)?;

    Ok(Json(json!({
        "success": true,
        "stats": stats
    })))
}

/// List dead jobs for one key (operators only)
pub async fn list_failed_jobs(
    State(state): State<QueueState>,
    Extension(user): Extension<User>,
    Path(key): Path<String>,
) -> Result<Json<Value>, AppError> {
    require_operator(&user)?;

    let jobs = state.producer.failed_jobs(&key).await.map_err(map_queue_error)?;

    Ok(Json(json!({
        "success": true,
        "key": key,
        "jobs": jobs
    })))
}

/// Re-drive a dead job (operators only)
pub async fn retry_job(
    State(state): State<QueueState>,
    Extension(user): Extension<User>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_operator(&user)?;
    info!("Retry request for job: {} from user: {}", job_id, user.id);

    let job = state.producer.retry_failed_job(job_id).await.map_err(map_queue_error)?;

    Ok(Json(json!({
        "success": true,
        "job_id": job.job_id,
        "status": job.status
    })))
}
