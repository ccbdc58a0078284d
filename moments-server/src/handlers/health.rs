//! Health check handlers
//!
//! Provides health and readiness endpoints for monitoring and orchestration.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status: "healthy" or "degraded"
    pub status: &'static str,
    /// Server version from Cargo.toml
    pub version: &'static str,
    /// Whether the metadata store survives restarts
    pub persistent: bool,
    /// Service name
    pub service: &'static str,
}

/// GET /health - Health check endpoint
///
/// Returns JSON with service status and storage mode. Used for
/// monitoring and load balancer health checks.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service health report", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let store_ok = state.store.health_check().await.is_ok();
    let status = if store_ok { "healthy" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        persistent: state.store.is_persistent(),
        service: "moments-server",
    })
}

/// Readiness response for Kubernetes
#[derive(Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Whether the service is ready to accept traffic
    pub ready: bool,
    /// Optional message explaining status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

/// GET /ready - Kubernetes readiness probe
///
/// Returns 200 once the metadata store answers. Unlike /health, this
/// is a simple yes/no check.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Readiness report", body = ReadyResponse)
    )
)]
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    match state.store.health_check().await {
        Ok(()) => Json(ReadyResponse {
            ready: true,
            message: None,
        }),
        Err(_) => Json(ReadyResponse {
            ready: false,
            message: Some("metadata store unreachable"),
        }),
    }
}
