use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use secrecy::ExposeSecret;
use subtle::ConstantTimeEq;

use crate::error::AppError;
use crate::state::AppState;

/// Pulls the token out of an `Authorization: Bearer <token>` header
fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Middleware that requires the admin password as a bearer token
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(token) = bearer_token(&request) else {
        tracing::warn!("Authentication attempt without credentials");
        return Err(AppError::Unauthorized("Authentication required"));
    };

    let expected = state.config.admin_password.expose_secret().as_bytes();
    if !bool::from(token.as_bytes().ct_eq(expected)) {
        tracing::warn!("Authentication attempt with invalid password");
        return Err(AppError::Unauthorized("Invalid password"));
    }

    Ok(next.run(request).await)
}
