//! Session management for the authenticated user.
//!
//! All routes here sit behind `require_session`; the `{user_id}` path
//! segment must name the authenticated user.

use crate::auth::AuthenticatedUser;
use crate::errors::AuthError;
use crate::models::SessionInfoResponse;
use crate::routes::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use std::sync::Arc;

/// GET /api/v1/user/{user_id}
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(user_id): Path<String>,
) -> Result<Json<SessionInfoResponse>, AuthError> {
    ensure_same_user(&user, &user_id)?;

    let record = state
        .sessions
        .session(&user_id)
        .await?
        .ok_or(AuthError::SessionStale)?;

    Ok(Json(SessionInfoResponse::from_record(record, Utc::now())))
}

/// PUT /api/v1/user/{user_id}/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(user_id): Path<String>,
) -> Result<StatusCode, AuthError> {
    ensure_same_user(&user, &user_id)?;
    state.sessions.logout(&user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/user/{user_id}
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(user_id): Path<String>,
) -> Result<StatusCode, AuthError> {
    ensure_same_user(&user, &user_id)?;

    if state.sessions.delete(&user_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AuthError::SessionStale)
    }
}

fn ensure_same_user(user: &AuthenticatedUser, path_user_id: &str) -> Result<(), AuthError> {
    if user.user_id() == path_user_id {
        Ok(())
    } else {
        tracing::warn!(target: "auth.http", "Request for another user's session");
        Err(AuthError::Forbidden(
            "Cannot access another user's session".to_string(),
        ))
    }
}
