use axum::{
    Router,
    routing::get,
};

use appointment_cell::appointment_routes;
use job_queue_cell::queue_routes;
use notification_cell::notification_routes;

use crate::bootstrap::Application;

pub fn create_router(app: &Application) -> Router {
    Router::new()
        .route("/", get(|| async { "Scheduling API is running!" }))
        .nest("/appointments", appointment_routes(app.appointment_state()))
        .nest("/notifications", notification_routes(app.notification_state()))
        .nest("/queue", queue_routes(app.queue_state()))
}
