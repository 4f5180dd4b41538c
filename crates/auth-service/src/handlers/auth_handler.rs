//! Login and token refresh.
//!
//! Both endpoints take their input token as a bearer credential and
//! answer with a fresh token pair.

use crate::auth::TokenKind;
use crate::errors::AuthError;
use crate::middleware::bearer_token;
use crate::models::TokenPairResponse;
use crate::routes::AppState;
use crate::services::TokenPair;
use axum::{extract::State, http::HeaderMap, Json};
use std::sync::Arc;

/// Exchange an identity token for a session.
///
/// POST /api/v1/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<TokenPairResponse>, AuthError> {
    let identity_token = bearer_token(&headers)?;
    let pair = state.sessions.login(identity_token).await?;
    Ok(Json(token_pair_response(pair)))
}

/// Rotate the session's tokens using its refresh token.
///
/// POST /api/v1/token
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<TokenPairResponse>, AuthError> {
    let refresh_token = bearer_token(&headers)?;
    let pair = state.sessions.refresh(refresh_token).await?;
    Ok(Json(token_pair_response(pair)))
}

fn token_pair_response(pair: TokenPair) -> TokenPairResponse {
    TokenPairResponse {
        access_token: pair.access.token().to_string(),
        refresh_token: pair.refresh.token().to_string(),
        token_type: "Bearer",
        expires_in: TokenKind::Access.lifetime().as_secs(),
        refresh_expires_in: TokenKind::Refresh.lifetime().as_secs(),
    }
}
