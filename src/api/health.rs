use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use std::time::Instant;

use crate::config::Environment;
use crate::db;
use crate::state::AppState;

const SERVICE_NAME: &str = "Invite Code Dashboard API";

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub message: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub environment: Environment,
    pub version: &'static str,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub response_time_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        message: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Liveness: the process is up and serving
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        environment: state.config.environment,
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Readiness: 503 until the database answers
async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<ReadinessResponse>) {
    let start = Instant::now();

    let (status, response) = match db::ping(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            ReadinessResponse {
                status: "healthy",
                response_time_ms: start.elapsed().as_millis(),
                error: None,
            },
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                ReadinessResponse {
                    status: "unhealthy",
                    response_time_ms: start.elapsed().as_millis(),
                    error: Some(format!("Database error: {}", e)),
                },
            )
        }
    };

    tracing::debug!(
        status = response.status,
        duration_ms = response.response_time_ms,
        "Readiness check completed"
    );

    (status, Json(response))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/health/ready", get(readiness_check))
}
