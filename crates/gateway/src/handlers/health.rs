//! Health check handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::AppState;

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
    pub catalog: CheckResult,
    pub live: CheckResult,
}

#[derive(Serialize)]
pub struct CheckResult {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckResult {
    fn endpoint(url: Option<&str>) -> Self {
        match url {
            Some(url) if !url.trim().is_empty() => CheckResult {
                status: "configured".to_string(),
                error: None,
            },
            _ => CheckResult {
                status: "missing".to_string(),
                error: Some("endpoint not configured".to_string()),
            },
        }
    }

    fn is_up(&self) -> bool {
        self.error.is_none()
    }
}

/// Liveness probe - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: shopwise_common::VERSION.to_string(),
    })
}

/// Readiness probe - both source endpoints must be configured
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let sources = &state.config.sources;
    let checks = ReadyChecks {
        catalog: CheckResult::endpoint(sources.catalog_url.as_deref()),
        live: CheckResult::endpoint(sources.live_url.as_deref()),
    };

    let all_ready = checks.catalog.is_up() && checks.live.is_up();
    let status = if all_ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

    (
        status,
        Json(ReadyResponse {
            status: if all_ready { "ready" } else { "not_ready" }.to_string(),
            checks,
        }),
    )
}
