//! HTTP request handlers for the built-in endpoints.

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{Method, StatusCode, Uri},
};
use serde::Serialize;

use crate::app::AppState;
use crate::domain::{ApiResponse, AppError, HealthResponse, HealthStatus, RequestError};

use super::extract::{CurrentActor, MaybePrincipal};

/// Detailed health check
pub async fn health_check_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let health = state.service.health_check(state.policy.maintenance_mode).await;
    Json(health)
}

/// Kubernetes liveness check
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}

/// Kubernetes readiness check
pub async fn readiness_handler(State(state): State<Arc<AppState>>) -> StatusCode {
    let health = state.service.health_check(state.policy.maintenance_mode).await;
    match health.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Prometheus scrape endpoint; absent when no recorder is installed.
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> Result<String, AppError> {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .ok_or_else(|| RequestError::EndpointNotFound("/metrics".to_string()).into())
}

/// Who the caller is, as recorded in audit stamps.
#[derive(Debug, Serialize)]
pub struct CurrentActorView {
    pub actor: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

pub async fn current_actor_handler(
    CurrentActor(actor): CurrentActor,
    MaybePrincipal(principal): MaybePrincipal,
) -> Json<ApiResponse<CurrentActorView>> {
    let roles = principal.map(|p| p.roles).unwrap_or_default();
    Json(ApiResponse::with_data(
        CurrentActorView {
            actor: actor.to_string(),
            roles,
        },
        "Current actor resolved",
    ))
}

/// Fallback for paths no route matches.
pub async fn endpoint_not_found_handler(uri: Uri) -> AppError {
    RequestError::EndpointNotFound(uri.path().to_string()).into()
}

/// Fallback for known paths requested with an unsupported method.
pub async fn method_not_allowed_handler(method: Method, uri: Uri) -> AppError {
    RequestError::MethodNotAllowed {
        method: method.to_string(),
        path: uri.path().to_string(),
    }
    .into()
}
