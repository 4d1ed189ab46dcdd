//! Metrics tracking middleware
//!
//! Tracks request latency, counts, and status codes per endpoint for the
//! `/metrics` report.
//!
//! Author: hephaex@gmail.com

use crate::state::AppState;
use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;

/// Path prefixes whose sub-paths are reported as one endpoint
const GROUPED_PREFIXES: [&str; 3] = ["/static", "/swagger-ui", "/api-docs"];

/// Metrics key for requests that matched no route
pub const UNMATCHED_ENDPOINT: &str = "unmatched";

/// Metrics tracking middleware
///
/// Records per endpoint:
/// - Request count
/// - Accumulated latency
/// - Client and server error counts
pub async fn metrics_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| normalize_endpoint(matched.as_str()))
        .unwrap_or_else(|| UNMATCHED_ENDPOINT.to_string());

    let response = next.run(request).await;

    let latency_us = start.elapsed().as_micros() as u64;
    let status = response.status().as_u16();

    // Record asynchronously to avoid blocking
    tokio::spawn(async move {
        state.record_request(endpoint, status, latency_us).await;
    });

    response
}

/// Normalize a matched route pattern into a metrics key
///
/// Keys come from route patterns, never raw request paths. Nested services
/// (static assets, API docs) are collapsed under their prefix.
fn normalize_endpoint(path: &str) -> String {
    for prefix in GROUPED_PREFIXES {
        if path == prefix || path.starts_with(&format!("{prefix}/")) {
            return format!("{prefix}/*");
        }
    }
    path.to_string()
}
