//! Token verification and issuance.
//!
//! - [`KeyResolver`]: identity-provider key fetch and cache
//! - [`IdentityVerifier`]: third-party identity token verification
//! - [`TokenService`]: session token issuance and validation

pub mod claims;
pub mod identity;
pub mod key_resolver;
pub mod session_tokens;

pub use claims::{
    AccessToken, AuthenticatedUser, IdentityClaims, RefreshToken, SessionClaims, SignedToken,
};
pub use identity::IdentityVerifier;
pub use key_resolver::KeyResolver;
pub use session_tokens::{TokenKind, TokenService};

use crate::errors::AuthError;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind};
use jsonwebtoken::{decode_header, Header};

/// Parse the JOSE header of a compact JWT.
///
/// Any failure here means the input is not a JWT at all.
pub(crate) fn parse_header(token: &str) -> Result<Header, AuthError> {
    decode_header(token).map_err(|e| {
        tracing::debug!(target: "auth.session", error = %e, "Failed to parse token header");
        AuthError::MalformedCredential("token is not a well-formed JWT".to_string())
    })
}

/// Map a `jsonwebtoken` decode failure onto the service taxonomy.
pub(crate) fn map_decode_error(err: &JwtError) -> AuthError {
    match err.kind() {
        ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
            AuthError::AlgorithmMismatch
        }
        ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
        ErrorKind::ImmatureSignature
        | ErrorKind::InvalidIssuer
        | ErrorKind::InvalidAudience
        | ErrorKind::InvalidSubject
        | ErrorKind::MissingRequiredClaim(_)
        | ErrorKind::Json(_) => AuthError::ClaimsInvalid,
        ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidKeyFormat => {
            AuthError::KeyFetchFailed("published key material is not a usable RSA key".to_string())
        }
        _ => AuthError::MalformedCredential("token is not a well-formed JWT".to_string()),
    }
}
