//! Authentication service error types.
//!
//! Every error maps to an HTTP status via the `IntoResponse` impl. Client
//! facing messages are generic; infrastructure details are logged here and
//! never returned.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::jwt::CredentialError;
use serde::Serialize;
use thiserror::Error;

/// Realm advertised in `WWW-Authenticate` challenges.
const AUTH_REALM: &str = "catalog-api";

/// Authentication service error type.
///
/// Maps to HTTP status codes:
/// - MalformedCredential: 400 Bad Request
/// - InvalidSignature, AlgorithmMismatch, ExpiredToken, ClaimsInvalid,
///   KeyNotFound, SessionStale: 401 Unauthorized
/// - Forbidden: 403 Forbidden
/// - KeyFetchFailed, StoreUnavailable, Internal: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Malformed credential: {0}")]
    MalformedCredential(String),

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Unexpected token signing algorithm")]
    AlgorithmMismatch,

    #[error("Token expired")]
    ExpiredToken,

    #[error("Token claims invalid")]
    ClaimsInvalid,

    #[error("Key fetch failed: {0}")]
    KeyFetchFailed(String),

    #[error("Signing key not found")]
    KeyNotFound,

    #[error("Session is no longer current")]
    SessionStale,

    #[error("Session store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MalformedCredential(_) => StatusCode::BAD_REQUEST,
            AuthError::InvalidSignature
            | AuthError::AlgorithmMismatch
            | AuthError::ExpiredToken
            | AuthError::ClaimsInvalid
            | AuthError::KeyNotFound
            | AuthError::SessionStale => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden(_) => StatusCode::FORBIDDEN,
            AuthError::KeyFetchFailed(_)
            | AuthError::StoreUnavailable(_)
            | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Bounded label for metrics.
    pub fn category(&self) -> &'static str {
        match self {
            AuthError::MalformedCredential(_) => "malformed",
            AuthError::InvalidSignature | AuthError::AlgorithmMismatch => "cryptographic",
            AuthError::ExpiredToken => "expired",
            AuthError::ClaimsInvalid => "claims",
            AuthError::KeyNotFound | AuthError::KeyFetchFailed(_) => "key",
            AuthError::SessionStale => "stale",
            AuthError::Forbidden(_) => "forbidden",
            AuthError::StoreUnavailable(_) | AuthError::Internal(_) => "internal",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (code, message) = match &self {
            AuthError::MalformedCredential(_) => (
                "MALFORMED_CREDENTIAL",
                "The Authorization header must carry a Bearer token".to_string(),
            ),
            AuthError::InvalidSignature
            | AuthError::AlgorithmMismatch
            | AuthError::ExpiredToken
            | AuthError::ClaimsInvalid
            | AuthError::KeyNotFound => (
                "INVALID_TOKEN",
                "The access token is invalid or expired".to_string(),
            ),
            AuthError::SessionStale => (
                "SESSION_STALE",
                "The session has ended or the token was replaced".to_string(),
            ),
            AuthError::Forbidden(reason) => ("FORBIDDEN", reason.clone()),
            AuthError::KeyFetchFailed(reason) => {
                tracing::error!(target: "auth.jwks", reason = %reason, "Identity key fetch failed");
                (
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
            AuthError::StoreUnavailable(reason) => {
                tracing::error!(target: "auth.store", error = %reason, "Session store operation failed");
                (
                    "DATABASE_ERROR",
                    "An internal database error occurred".to_string(),
                )
            }
            AuthError::Internal(reason) => {
                tracing::error!(target: "auth.http", reason = %reason, "Internal error");
                (
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorDetail { code, message },
        };

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            let challenge = format!("Bearer realm=\"{AUTH_REALM}\", error=\"invalid_token\"");
            if let Ok(header_value) = challenge.parse() {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
    }
}

impl From<CredentialError> for AuthError {
    fn from(err: CredentialError) -> Self {
        let reason = match err {
            CredentialError::Missing => "missing Authorization header",
            CredentialError::WrongScheme => "unsupported authorization scheme",
            CredentialError::EmptyToken => "empty bearer token",
            CredentialError::TooLarge => "token exceeds size limit",
        };
        AuthError::MalformedCredential(reason.to_string())
    }
}

/// Convert sqlx errors to AuthError
impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        AuthError::StoreUnavailable(err.to_string())
    }
}
