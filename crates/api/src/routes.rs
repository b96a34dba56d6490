use crate::{handlers::*, AppState};
use axum::{routing::get, Router};

pub fn create_router() -> Router<AppState> {
    Router::new()
        // Queries
        .route("/payments", get(payments))
        .route("/tx", get(transaction))
        .route("/trustlines", get(trustlines))
        // Collector progress
        .route("/status", get(status))
        // Health and metrics
        .route("/healthz", get(health_check))
        .route("/metrics", get(metrics))
}

pub fn build_router(state: AppState) -> Router {
    create_router().with_state(state)
}
