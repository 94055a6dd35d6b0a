use std::sync::Arc;
use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::{get_queue_stats, list_failed_jobs, retry_job};
use crate::services::producer::JobProducerService;

#[derive(Clone)]
pub struct QueueState {
    pub config: Arc<AppConfig>,
    pub producer: Arc<JobProducerService>,
}

pub fn queue_routes(state: QueueState) -> Router {
    let protected_routes = Router::new()
        .route("/stats", get(get_queue_stats))
        .route("/failed/{key}", get(list_failed_jobs))
        .route("/jobs/{job_id}/retry", post(retry_job))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
