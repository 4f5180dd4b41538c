use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use std::fmt;

/// Persisted session of one user (maps to user_sessions table).
///
/// `access_token` is the only access token accepted for `user_id`; any
/// other token for the same subject has been superseded.
#[derive(Clone, FromRow, PartialEq, Eq)]
pub struct SessionRecord {
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: String,

    /// Expiry of the current access token, or the logout instant.
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Whether the session can no longer authorize requests at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

impl fmt::Debug for SessionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRecord")
            .field("user_id", &"[REDACTED]")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// New token pair written by a refresh.
#[derive(Clone)]
pub struct TokenRotation {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Token pair returned by login and refresh.
#[derive(Serialize)]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,

    /// Seconds until the access token expires.
    pub expires_in: u64,

    /// Seconds until the refresh token expires.
    pub refresh_expires_in: u64,
}

/// Session metadata exposed to its owner. Token strings are not included.
#[derive(Debug, Serialize)]
pub struct SessionInfoResponse {
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub active: bool,
}

impl SessionInfoResponse {
    pub fn from_record(record: SessionRecord, now: DateTime<Utc>) -> Self {
        Self {
            active: !record.is_expired_at(now),
            user_id: record.user_id,
            expires_at: record.expires_at,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
}
