//! Health check handlers
//!
//! Author: hephaex@gmail.com

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use medgenie_rag::CacheStatsReport;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use utoipa::ToSchema;

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub build_info: BuildInfo,
}

#[derive(Serialize, ToSchema)]
pub struct BuildInfo {
    pub name: String,
    /// `debug` or `release`
    pub profile: String,
}

/// Liveness probe - basic health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        build_info: BuildInfo {
            name: env!("CARGO_PKG_NAME").to_string(),
            profile: build_profile().to_string(),
        },
    })
}

fn build_profile() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    }
}

/// Readiness response
#[derive(Serialize, ToSchema)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub checks: ReadinessChecks,
}

#[derive(Serialize, ToSchema)]
pub struct ReadinessChecks {
    /// Front-end entry page is present on disk
    pub static_files: bool,
    /// Live entries in the retrieval cache
    pub cached_queries: u64,
}

/// Readiness probe
#[utoipa::path(
    get,
    path = "/ready",
    tag = "health",
    responses(
        (status = 200, description = "Service is ready", body = ReadinessResponse),
        (status = 503, description = "Service not ready", body = ReadinessResponse)
    )
)]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let is_ready = state.is_ready();
    let index = state.config.server.static_dir.join("index.html");

    let response = ReadinessResponse {
        ready: is_ready,
        checks: ReadinessChecks {
            static_files: tokio::fs::try_exists(&index).await.unwrap_or(false),
            cached_queries: state.pipeline.cache().entry_count(),
        },
    };

    if is_ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// JSON metrics response
#[derive(Serialize)]
pub struct MetricsResponse {
    pub uptime_seconds: u64,
    pub total_requests: u64,
    pub requests_per_second: f64,
    pub cache: CacheStatsReport,
    pub cache_entries: u64,
    pub endpoints: HashMap<String, EndpointReport>,
}

#[derive(Serialize)]
pub struct EndpointReport {
    pub requests: u64,
    pub client_errors: u64,
    pub server_errors: u64,
    pub avg_latency_ms: f64,
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let uptime = state.uptime_secs();
    let total_requests = state.get_request_count();
    let rps = if uptime > 0 {
        total_requests as f64 / uptime as f64
    } else {
        0.0
    };

    let cache = state.pipeline.cache();

    Json(MetricsResponse {
        uptime_seconds: uptime,
        total_requests,
        requests_per_second: rps,
        cache: cache.stats().report(),
        cache_entries: cache.entry_count(),
        endpoints: state
            .endpoint_metrics()
            .await
            .into_iter()
            .map(|(endpoint, m)| {
                let report = EndpointReport {
                    requests: m.requests,
                    client_errors: m.client_errors,
                    server_errors: m.server_errors,
                    avg_latency_ms: m.avg_latency_ms(),
                };
                (endpoint, report)
            })
            .collect(),
    })
}
