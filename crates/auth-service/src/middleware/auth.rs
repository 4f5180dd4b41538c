//! Session authorization for protected routes.
//!
//! Extracts the bearer credential, authorizes it against the current
//! session and injects `AuthenticatedUser` into request extensions.

use crate::errors::AuthError;
use crate::routes::AppState;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::IntoResponse,
};
use common::jwt::{parse_bearer, CredentialError};
use std::sync::Arc;
use tracing::instrument;

/// Extract the bearer credential from the `Authorization` header.
///
/// Used by the middleware and by the login/refresh handlers, which take
/// their input token the same way.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(CredentialError::Missing)
        .and_then(|v| v.to_str().map_err(|_| CredentialError::WrongScheme))
        .map_err(|e| {
            tracing::debug!(target: "auth.middleware", error = %e, "Unusable Authorization header");
            AuthError::from(e)
        })?;

    parse_bearer(value).map_err(|e| {
        tracing::debug!(target: "auth.middleware", error = %e, "Unusable Authorization header");
        AuthError::from(e)
    })
}

/// Authorization middleware for session-protected routes.
///
/// # Response
///
/// - 400 if the credential is missing or not a bearer token
/// - 401 if the token is invalid or no longer the session's token
/// - Continues with `AuthenticatedUser` in extensions otherwise
#[instrument(skip_all, name = "auth.middleware.session")]
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, AuthError> {
    let token = bearer_token(req.headers())?;

    let user = state.sessions.authorize(token).await?;
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}
