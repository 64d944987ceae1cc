//! Health check handlers

use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: ReadyChecks,
}

#[derive(Serialize)]
pub struct ReadyChecks {
    pub tools: CheckResult,
}

#[derive(Serialize)]
pub struct CheckResult {
    pub status: String,
    pub count: usize,
}

/// Liveness probe - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: subquery_common::VERSION.to_string(),
    })
}

/// Readiness probe - ready once at least one tool is registered
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let count = state.engine.tools().len();
    let ready = count > 0;

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadyResponse {
            status: if ready { "ready" } else { "not_ready" }.to_string(),
            checks: ReadyChecks {
                tools: CheckResult {
                    status: if ready { "up" } else { "down" }.to_string(),
                    count,
                },
            },
        }),
    )
}
