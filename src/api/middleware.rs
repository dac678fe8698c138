//! HTTP middleware for API layer.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crate::app::AppState;
use crate::domain::{AppError, AuthError};

use super::security::is_public_path;

const MAINTENANCE_MESSAGE: &str = "The service is under maintenance. Please try again later.";

/// Bearer token authentication middleware.
///
/// Public paths pass through untouched. Everything else needs an
/// `Authorization: Bearer <token>` header the configured verifier accepts;
/// the resolved principal is stored in the request extensions.
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    if is_public_path(request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let token = bearer_token(request.headers())
        .inspect_err(|err| warn!(path = %request.uri().path(), error = %err, "Authentication failed"))?
        .to_owned();

    let principal = state.token_verifier.verify(&token).await.inspect_err(|err| {
        warn!(error = %err, "Token rejected");
    })?;

    debug!(subject = %principal.subject, "Authenticated request");
    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// Extract the token from an `Authorization: Bearer` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidToken("authorization header is not visible ASCII".to_string()))?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or_else(|| AuthError::InvalidToken("expected the Bearer scheme".to_string()))?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidToken(format!("unsupported scheme '{scheme}'")));
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }
    Ok(token)
}

/// Rejects every non-public request while maintenance mode is on.
pub async fn maintenance_gate(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    if state.policy.maintenance_mode && !is_public_path(request.uri().path()) {
        return Err(AppError::MaintenanceMode(MAINTENANCE_MESSAGE.to_string()));
    }
    Ok(next.run(request).await)
}
