//! API route definitions
//!
//! Author: hephaex@gmail.com

use crate::handlers::{health, query};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Question-answering routes
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/retrieve", post(query::retrieve_handler))
        .route("/answer", post(query::answer_handler))
}

/// Liveness, readiness and metrics routes
pub fn health_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics))
}
