//! Session token issuance and validation.
//!
//! Access and refresh tokens are HS256 JWTs, each kind signed with its own
//! 64-byte key. Both keys are drawn from the system CSPRNG when the
//! [`TokenService`] is created and live only in memory, so a restart
//! invalidates every outstanding session token.
//!
//! Every token carries a random `jti`, so two tokens minted for the same
//! user in the same second still differ.
//!
//! Validation here is purely cryptographic and time based. Whether a token
//! is still the current one for its user is decided against the session
//! store by the caller.

use crate::auth::claims::{AccessToken, RefreshToken, SessionClaims, SignedToken};
use crate::auth::{map_decode_error, parse_header};
use crate::errors::AuthError;
use crate::observability::metrics;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use common::jwt::check_token_size;
use common::secret::{ExposeSecret, SecretBox};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use ring::rand::{SecureRandom, SystemRandom};
use std::time::Duration;
use tracing::instrument;

/// Issuer written into every session token.
pub const SESSION_ISSUER: &str = "fragrances-api";

/// Access token lifetime (24 hours).
pub const ACCESS_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Refresh token lifetime (168 hours).
pub const REFRESH_TOKEN_LIFETIME: Duration = Duration::from_secs(168 * 60 * 60);

/// Size of each HMAC signing key in bytes.
const SIGNING_KEY_BYTES: usize = 64;

/// Size of the random token id before encoding.
const TOKEN_ID_BYTES: usize = 16;

/// Which of the two session token kinds an operation concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn lifetime(self) -> Duration {
        match self {
            TokenKind::Access => ACCESS_TOKEN_LIFETIME,
            TokenKind::Refresh => REFRESH_TOKEN_LIFETIME,
        }
    }

    /// Metric label.
    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

/// Issues and validates session tokens with process-local keys.
pub struct TokenService {
    access_key: SecretBox<Vec<u8>>,
    refresh_key: SecretBox<Vec<u8>>,
    rng: SystemRandom,
}

impl TokenService {
    /// Create a service with freshly generated signing keys.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Internal` if the system RNG fails.
    pub fn generate() -> Result<Self, AuthError> {
        let rng = SystemRandom::new();
        Ok(Self {
            access_key: random_key(&rng)?,
            refresh_key: random_key(&rng)?,
            rng,
        })
    }

    /// Mint an access token for `subject`.
    pub fn issue_access(&self, audience: &str, subject: &str) -> Result<AccessToken, AuthError> {
        self.issue(TokenKind::Access, audience, subject).map(AccessToken)
    }

    /// Mint a refresh token for `subject`.
    pub fn issue_refresh(&self, audience: &str, subject: &str) -> Result<RefreshToken, AuthError> {
        self.issue(TokenKind::Refresh, audience, subject)
            .map(RefreshToken)
    }

    /// Verify an access token's signature and expiry.
    pub fn validate_access(&self, token: &str) -> Result<AccessToken, AuthError> {
        self.validate(TokenKind::Access, token).map(AccessToken)
    }

    /// Verify a refresh token's signature and expiry.
    pub fn validate_refresh(&self, token: &str) -> Result<RefreshToken, AuthError> {
        self.validate(TokenKind::Refresh, token).map(RefreshToken)
    }

    fn key(&self, kind: TokenKind) -> &[u8] {
        match kind {
            TokenKind::Access => self.access_key.expose_secret().as_slice(),
            TokenKind::Refresh => self.refresh_key.expose_secret().as_slice(),
        }
    }

    #[instrument(skip_all, name = "auth.session.issue", fields(kind = kind.as_str()))]
    fn issue(&self, kind: TokenKind, audience: &str, subject: &str) -> Result<SignedToken, AuthError> {
        let iat = Utc::now().timestamp();
        let lifetime = i64::try_from(kind.lifetime().as_secs())
            .map_err(|e| AuthError::Internal(format!("token lifetime overflow: {e}")))?;

        let claims = SessionClaims {
            iss: SESSION_ISSUER.to_string(),
            sub: subject.to_string(),
            aud: audience.to_string(),
            iat,
            exp: iat + lifetime,
            jti: self.token_id()?,
        };

        let signed = self.sign(kind, claims)?;
        metrics::record_token_issuance(kind.as_str());
        tracing::debug!(target: "auth.session", exp = signed.claims.exp, "Session token issued");
        Ok(signed)
    }

    fn token_id(&self) -> Result<String, AuthError> {
        let mut id = [0u8; TOKEN_ID_BYTES];
        self.rng
            .fill(&mut id)
            .map_err(|_| AuthError::Internal("system RNG failure".to_string()))?;
        Ok(URL_SAFE_NO_PAD.encode(id))
    }

    fn sign(&self, kind: TokenKind, claims: SessionClaims) -> Result<SignedToken, AuthError> {
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.key(kind)),
        )
        .map_err(|e| {
            tracing::error!(target: "auth.session", error = %e, "Failed to sign session token");
            AuthError::Internal(format!("session token signing failed: {e}"))
        })?;

        Ok(SignedToken { claims, token })
    }

    #[instrument(skip_all, name = "auth.session.validate", fields(kind = kind.as_str()))]
    fn validate(&self, kind: TokenKind, token: &str) -> Result<SignedToken, AuthError> {
        let result = self.decode(kind, token);
        match &result {
            Ok(_) => metrics::record_token_validation(kind.as_str(), "success", None),
            Err(e) => {
                tracing::debug!(target: "auth.session", error = %e, "Session token rejected");
                metrics::record_token_validation(kind.as_str(), "error", Some(e.category()));
            }
        }
        result
    }

    fn decode(&self, kind: TokenKind, token: &str) -> Result<SignedToken, AuthError> {
        check_token_size(token)?;
        parse_header(token)?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_aud = false;
        validation.set_issuer(&[SESSION_ISSUER]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        let token_data = decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.key(kind)),
            &validation,
        )
        .map_err(|e| map_decode_error(&e))?;

        Ok(SignedToken {
            claims: token_data.claims,
            token: token.to_string(),
        })
    }
}

fn random_key(rng: &SystemRandom) -> Result<SecretBox<Vec<u8>>, AuthError> {
    let mut key = vec![0u8; SIGNING_KEY_BYTES];
    rng.fill(&mut key)
        .map_err(|_| AuthError::Internal("system RNG failure".to_string()))?;
    Ok(SecretBox::new(Box::new(key)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::generate().unwrap()
    }

    fn claims_expiring_at(exp: i64) -> SessionClaims {
        SessionClaims {
            iss: SESSION_ISSUER.to_string(),
            sub: "u1".to_string(),
            aud: "fragrances-client".to_string(),
            iat: exp - 3600,
            exp,
            jti: "dGVzdC10b2tlbi1pZA".to_string(),
        }
    }

    /// Swap the first character of the signature segment for another
    /// base64url character.
    fn tamper_signature(token: &str) -> String {
        let (signing_input, signature) = token.rsplit_once('.').unwrap();
        let first = signature.chars().next().unwrap();
        let replacement = if first == 'A' { 'B' } else { 'A' };
        let rest: String = signature.chars().skip(1).collect();
        format!("{signing_input}.{replacement}{rest}")
    }

    #[test]
    fn test_access_round_trip() {
        let service = service();
        let issued = service.issue_access("fragrances-client", "u1").unwrap();

        let validated = service.validate_access(issued.token()).unwrap();
        assert_eq!(validated.claims(), issued.claims());
        assert_eq!(validated.claims().aud, "fragrances-client");
        assert_eq!(validated.subject(), "u1");
        assert_eq!(validated.claims().iss, SESSION_ISSUER);
    }

    #[test]
    fn test_refresh_round_trip() {
        let service = service();
        let issued = service.issue_refresh("mobile", "user-42").unwrap();

        let validated = service.validate_refresh(issued.token()).unwrap();
        assert_eq!(validated.subject(), "user-42");
        assert_eq!(validated.claims().aud, "mobile");
    }

    #[test]
    fn test_lifetimes() {
        let service = service();
        let access = service.issue_access("a", "s").unwrap();
        let refresh = service.issue_refresh("a", "s").unwrap();

        assert_eq!(access.claims().exp - access.claims().iat, 24 * 3600);
        assert_eq!(refresh.claims().exp - refresh.claims().iat, 168 * 3600);
    }

    #[test]
    fn test_tampered_signature_is_rejected() {
        let service = service();
        let access = service.issue_access("a", "u1").unwrap();
        let refresh = service.issue_refresh("a", "u1").unwrap();

        assert!(matches!(
            service.validate_access(&tamper_signature(access.token())),
            Err(AuthError::InvalidSignature)
        ));
        assert!(matches!(
            service.validate_refresh(&tamper_signature(refresh.token())),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn test_token_kinds_are_not_interchangeable() {
        let service = service();
        let access = service.issue_access("a", "u1").unwrap();
        let refresh = service.issue_refresh("a", "u1").unwrap();

        assert!(matches!(
            service.validate_refresh(access.token()),
            Err(AuthError::InvalidSignature)
        ));
        assert!(matches!(
            service.validate_access(refresh.token()),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn test_tokens_from_another_process_are_rejected() {
        let before_restart = service();
        let after_restart = service();
        let access = before_restart.issue_access("a", "u1").unwrap();

        assert!(matches!(
            after_restart.validate_access(access.token()),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn test_expiry_boundary() {
        let service = service();
        let now = Utc::now().timestamp();

        let expired = service
            .sign(TokenKind::Access, claims_expiring_at(now - 1))
            .unwrap();
        assert!(matches!(
            service.validate_access(&expired.token),
            Err(AuthError::ExpiredToken)
        ));

        let live = service
            .sign(TokenKind::Access, claims_expiring_at(now + 1))
            .unwrap();
        assert!(service.validate_access(&live.token).is_ok());
    }

    #[test]
    fn test_foreign_issuer_is_rejected() {
        let service = service();
        let mut claims = claims_expiring_at(Utc::now().timestamp() + 600);
        claims.iss = "someone-else".to_string();
        let forged = service.sign(TokenKind::Access, claims).unwrap();

        assert!(matches!(
            service.validate_access(&forged.token),
            Err(AuthError::ClaimsInvalid)
        ));
    }

    #[test]
    fn test_unexpected_algorithm_is_rejected() {
        let service = service();
        let claims = claims_expiring_at(Utc::now().timestamp() + 600);
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(service.key(TokenKind::Access)),
        )
        .unwrap();

        assert!(matches!(
            service.validate_access(&token),
            Err(AuthError::AlgorithmMismatch)
        ));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let service = service();
        assert!(matches!(
            service.validate_access("definitely.not.ajwt"),
            Err(AuthError::MalformedCredential(_))
        ));
        assert!(matches!(
            service.validate_access("nodots"),
            Err(AuthError::MalformedCredential(_))
        ));
    }

    #[test]
    fn test_same_second_tokens_differ() {
        let service = service();
        let first = service.issue_access("a", "u1").unwrap();
        let second = service.issue_access("a", "u1").unwrap();
        let first_refresh = service.issue_refresh("a", "u1").unwrap();
        let second_refresh = service.issue_refresh("a", "u1").unwrap();

        assert_ne!(first.token(), second.token());
        assert_ne!(first.claims().jti, second.claims().jti);
        assert_ne!(first_refresh.token(), second_refresh.token());
        assert_eq!(first.claims().jti.len(), 22);
    }

    #[test]
    fn test_token_without_id_is_rejected() {
        let service = service();
        let claims = serde_json::json!({
            "iss": SESSION_ISSUER,
            "sub": "u1",
            "aud": "a",
            "iat": Utc::now().timestamp(),
            "exp": Utc::now().timestamp() + 600,
        });
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(service.key(TokenKind::Access)),
        )
        .unwrap();

        assert!(service.validate_access(&token).is_err());
    }

    #[test]
    fn test_generated_keys_differ() {
        let service = service();
        assert_eq!(service.key(TokenKind::Access).len(), SIGNING_KEY_BYTES);
        assert_ne!(
            service.key(TokenKind::Access),
            service.key(TokenKind::Refresh)
        );
    }
}
