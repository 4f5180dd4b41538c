//! Bearer-credential helpers shared by the token verifiers.
//!
//! - Size ceiling applied before any parsing or cryptography
//! - `Authorization` header parsing for the `Bearer` scheme
//!
//! All variants share one client-facing message; the variant is for logs.

use thiserror::Error;

/// Maximum accepted token size in bytes (8 KiB).
///
/// Identity-provider tokens are around 1 KiB and session tokens a few
/// hundred bytes. Anything larger is rejected before base64 decoding.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// Authentication scheme expected in the `Authorization` header.
pub const BEARER_SCHEME: &str = "Bearer";

/// Reasons a presented credential could not even be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// No `Authorization` header was sent.
    #[error("The credential is missing or malformed")]
    Missing,

    /// Header present but not `Bearer <token>`.
    #[error("The credential is missing or malformed")]
    WrongScheme,

    /// Scheme correct but the token part is empty.
    #[error("The credential is missing or malformed")]
    EmptyToken,

    /// Token exceeds [`MAX_JWT_SIZE_BYTES`].
    #[error("The credential is missing or malformed")]
    TooLarge,
}

/// Extract the token from an `Authorization` header value.
///
/// The scheme is matched case-insensitively and surrounding whitespace
/// around the token is ignored. The token is size-checked as well.
///
/// # Errors
///
/// Returns [`CredentialError::WrongScheme`] for any scheme other than
/// `Bearer`, [`CredentialError::EmptyToken`] when nothing follows the
/// scheme, and [`CredentialError::TooLarge`] for oversized tokens.
pub fn parse_bearer(header_value: &str) -> Result<&str, CredentialError> {
    let (scheme, token) = header_value
        .trim_start()
        .split_once(' ')
        .ok_or(CredentialError::WrongScheme)?;

    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
        return Err(CredentialError::WrongScheme);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(CredentialError::EmptyToken);
    }

    check_token_size(token)?;
    Ok(token)
}

/// Reject tokens larger than [`MAX_JWT_SIZE_BYTES`].
///
/// # Errors
///
/// Returns [`CredentialError::TooLarge`] if the token is oversized.
pub fn check_token_size(token: &str) -> Result<(), CredentialError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        return Err(CredentialError::TooLarge);
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bearer_extracts_token() {
        assert_eq!(parse_bearer("Bearer abc.def.ghi").unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_parse_bearer_scheme_is_case_insensitive() {
        assert_eq!(parse_bearer("bearer abc").unwrap(), "abc");
        assert_eq!(parse_bearer("BEARER abc").unwrap(), "abc");
    }

    #[test]
    fn test_parse_bearer_rejects_other_schemes() {
        assert_eq!(
            parse_bearer("Basic dXNlcjpwYXNz"),
            Err(CredentialError::WrongScheme)
        );
        assert_eq!(parse_bearer("Bearerabc"), Err(CredentialError::WrongScheme));
        assert_eq!(parse_bearer(""), Err(CredentialError::WrongScheme));
    }

    #[test]
    fn test_parse_bearer_rejects_empty_token() {
        assert_eq!(parse_bearer("Bearer "), Err(CredentialError::EmptyToken));
        assert_eq!(parse_bearer("Bearer    "), Err(CredentialError::EmptyToken));
    }

    #[test]
    fn test_parse_bearer_rejects_oversized_token() {
        let header = format!("Bearer {}", "a".repeat(MAX_JWT_SIZE_BYTES + 1));
        assert_eq!(parse_bearer(&header), Err(CredentialError::TooLarge));
    }

    #[test]
    fn test_token_at_size_limit_is_accepted() {
        let token = "a".repeat(MAX_JWT_SIZE_BYTES);
        assert!(check_token_size(&token).is_ok());
    }

    #[test]
    fn test_error_messages_are_uniform() {
        let messages: Vec<String> = [
            CredentialError::Missing,
            CredentialError::WrongScheme,
            CredentialError::EmptyToken,
            CredentialError::TooLarge,
        ]
        .iter()
        .map(ToString::to_string)
        .collect();

        assert!(messages
            .iter()
            .all(|m| m == "The credential is missing or malformed"));
    }
}
