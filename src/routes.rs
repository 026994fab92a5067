use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::{self, AppState};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // HTML page; the form posts back here
        .route("/", get(handlers::index).post(handlers::create_task))
        .route("/search", get(handlers::search))
        // JSON API
        .route("/tasks", get(handlers::list_tasks).post(handlers::create_task))
        .route("/tasks/{id}", get(handlers::get_task))
        .route("/tasks/{id}/delete", get(handlers::delete_task))
        .route("/tasks/{id}/complete", get(handlers::complete_task))
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
