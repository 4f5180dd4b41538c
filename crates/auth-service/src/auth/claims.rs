//! Claim sets carried by session and identity tokens.
//!
//! Subjects and token strings are redacted in Debug output.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Registered claims of a session token (access or refresh).
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    /// Issuer, always the service name.
    pub iss: String,

    /// Subject (user identifier).
    pub sub: String,

    /// Audience the token was minted for.
    pub aud: String,

    /// Issued-at timestamp (Unix epoch seconds).
    pub iat: i64,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Random token id. Tokens minted in the same second differ by it.
    pub jti: String,
}

impl fmt::Debug for SessionClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionClaims")
            .field("iss", &self.iss)
            .field("sub", &"[REDACTED]")
            .field("aud", &self.aud)
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .field("jti", &self.jti)
            .finish()
    }
}

/// A signed session token together with the claims it encodes.
#[derive(Clone)]
pub struct SignedToken {
    pub claims: SessionClaims,

    /// Compact JWS serialization.
    pub token: String,
}

impl fmt::Debug for SignedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedToken")
            .field("claims", &self.claims)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Short-lived token presented on protected requests.
#[derive(Debug, Clone)]
pub struct AccessToken(pub SignedToken);

/// Long-lived token exchanged for a fresh access/refresh pair.
#[derive(Debug, Clone)]
pub struct RefreshToken(pub SignedToken);

macro_rules! signed_token_accessors {
    ($ty:ty) => {
        impl $ty {
            pub fn claims(&self) -> &SessionClaims {
                &self.0.claims
            }

            pub fn token(&self) -> &str {
                &self.0.token
            }

            pub fn subject(&self) -> &str {
                &self.0.claims.sub
            }
        }
    };
}

signed_token_accessors!(AccessToken);
signed_token_accessors!(RefreshToken);

/// Claims of an identity token issued by the external identity provider.
///
/// Every field is required; a token missing one fails deserialization.
#[derive(Clone, Deserialize)]
pub struct IdentityClaims {
    pub exp: i64,
    pub iat: i64,
    pub aud: String,
    pub iss: String,
    pub sub: String,

    /// Provider-specific duplicate of `sub`.
    pub user_id: String,

    /// Key id from the token header, filled in after verification.
    #[serde(skip)]
    pub kid: String,
}

impl fmt::Debug for IdentityClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityClaims")
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("aud", &self.aud)
            .field("iss", &self.iss)
            .field("sub", &"[REDACTED]")
            .field("user_id", &"[REDACTED]")
            .field("kid", &self.kid)
            .finish()
    }
}

/// Identity of the caller on a request that passed session validation.
///
/// Inserted into request extensions by the auth middleware.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub claims: SessionClaims,
}

impl AuthenticatedUser {
    pub fn user_id(&self) -> &str {
        &self.claims.sub
    }
}
