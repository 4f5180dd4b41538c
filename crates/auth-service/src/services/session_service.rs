//! Session lifecycle: login, refresh, request authorization, logout.
//!
//! ```text
//! anonymous --login--> active --refresh--> active
//!                        |                   |
//!                        +--time passes------+--> expired
//!                        +--logout-----------+--> revoked
//! ```
//!
//! Cryptographic validity is checked by [`TokenService`]; session currency
//! (is this still the token on record?) is checked here against the
//! [`SessionStore`].

use crate::auth::{AccessToken, AuthenticatedUser, IdentityVerifier, RefreshToken, TokenService};
use crate::errors::AuthError;
use crate::models::{SessionRecord, TokenRotation};
use crate::observability::metrics;
use crate::repositories::SessionStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::instrument;

/// Freshly issued access/refresh pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: AccessToken,
    pub refresh: RefreshToken,
}

/// Orchestrates identity verification, token issuance and the session store.
pub struct SessionService {
    identity_verifier: Arc<IdentityVerifier>,
    tokens: Arc<TokenService>,
    store: Arc<dyn SessionStore>,

    /// Audience stamped into issued session tokens.
    audience: String,
}

impl SessionService {
    pub fn new(
        identity_verifier: Arc<IdentityVerifier>,
        tokens: Arc<TokenService>,
        store: Arc<dyn SessionStore>,
        audience: String,
    ) -> Self {
        Self {
            identity_verifier,
            tokens,
            store,
            audience,
        }
    }

    /// Exchange a verified identity token for a new session.
    ///
    /// Any previous session of the same user is overwritten, which makes
    /// its tokens stale.
    #[instrument(skip_all, name = "auth.session.login")]
    pub async fn login(&self, identity_token: &str) -> Result<TokenPair, AuthError> {
        let result = self.login_inner(identity_token).await;
        metrics::record_login(if result.is_ok() { "success" } else { "error" });
        result
    }

    async fn login_inner(&self, identity_token: &str) -> Result<TokenPair, AuthError> {
        let identity = self.identity_verifier.verify(identity_token).await?;
        let pair = self.issue_pair(&identity.sub)?;

        let now = Utc::now();
        let record = SessionRecord {
            user_id: identity.sub,
            access_token: pair.access.token().to_string(),
            refresh_token: pair.refresh.token().to_string(),
            expires_at: timestamp(pair.access.claims().exp)?,
            created_at: now,
            updated_at: now,
        };
        self.store.insert(&record).await?;

        tracing::info!(target: "auth.session", "Session started");
        Ok(pair)
    }

    /// Replace the session's token pair using its current refresh token.
    ///
    /// # Errors
    ///
    /// `AuthError::SessionStale` if the refresh token is not the stored
    /// one (already used, superseded by a login, or revoked by logout).
    #[instrument(skip_all, name = "auth.session.refresh")]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let presented = self.tokens.validate_refresh(refresh_token)?;
        let pair = self.issue_pair(presented.subject())?;

        let rotation = TokenRotation {
            access_token: pair.access.token().to_string(),
            refresh_token: pair.refresh.token().to_string(),
            expires_at: timestamp(pair.access.claims().exp)?,
        };

        match self
            .store
            .rotate(presented.subject(), presented.token(), &rotation)
            .await?
        {
            Some(_) => {
                tracing::debug!(target: "auth.session", "Session tokens rotated");
                Ok(pair)
            }
            None => {
                tracing::debug!(target: "auth.session", "Refresh token is not current");
                Err(AuthError::SessionStale)
            }
        }
    }

    /// Authorize a request bearing `access_token`.
    ///
    /// Passes only if the token verifies, a session exists for its
    /// subject, the stored access token is this exact token, and the
    /// session has not expired or been revoked.
    #[instrument(skip_all, name = "auth.session.authorize")]
    pub async fn authorize(&self, access_token: &str) -> Result<AuthenticatedUser, AuthError> {
        let presented = self.tokens.validate_access(access_token)?;

        let record = self
            .store
            .get_by_id(presented.subject())
            .await?
            .ok_or_else(|| {
                tracing::debug!(target: "auth.session", "No session for token subject");
                AuthError::SessionStale
            })?;

        if record.access_token != presented.token() {
            tracing::debug!(target: "auth.session", "Access token superseded");
            return Err(AuthError::SessionStale);
        }

        if record.is_expired_at(Utc::now()) {
            tracing::debug!(target: "auth.session", "Session expired or revoked");
            return Err(AuthError::SessionStale);
        }

        Ok(AuthenticatedUser {
            claims: presented.claims().clone(),
        })
    }

    /// Revoke the user's session: expiry becomes now and the refresh
    /// token is cleared so it cannot revive the session.
    #[instrument(skip_all, name = "auth.session.logout")]
    pub async fn logout(&self, user_id: &str) -> Result<(), AuthError> {
        let Some(mut record) = self.store.get_by_id(user_id).await? else {
            return Err(AuthError::SessionStale);
        };

        let now = Utc::now();
        record.expires_at = now;
        record.refresh_token = String::new();
        record.updated_at = now;

        if !self.store.update(&record).await? {
            return Err(AuthError::SessionStale);
        }

        tracing::info!(target: "auth.session", "Session revoked");
        Ok(())
    }

    /// Current session record of `user_id`.
    pub async fn session(&self, user_id: &str) -> Result<Option<SessionRecord>, AuthError> {
        self.store.get_by_id(user_id).await
    }

    /// Remove the user's session record entirely.
    #[instrument(skip_all, name = "auth.session.delete")]
    pub async fn delete(&self, user_id: &str) -> Result<bool, AuthError> {
        self.store.delete(user_id).await
    }

    fn issue_pair(&self, subject: &str) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access: self.tokens.issue_access(&self.audience, subject)?,
            refresh: self.tokens.issue_refresh(&self.audience, subject)?,
        })
    }
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, AuthError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| AuthError::Internal(format!("timestamp out of range: {secs}")))
}
