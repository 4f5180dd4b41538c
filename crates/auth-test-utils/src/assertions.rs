//! Custom test assertions for session tokens.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct JwtHeader {
    alg: String,
}

#[derive(Debug, Deserialize)]
struct JwtClaims {
    sub: String,
    iss: String,
    iat: i64,
    exp: i64,
}

/// Assertions on compact session tokens, without verifying signatures.
///
/// # Example
/// ```rust,ignore
/// access_token
///     .assert_session_token()
///     .assert_for_subject("alice")
///     .assert_lifetime_secs(24 * 3600);
/// ```
pub trait SessionTokenAssertions {
    /// Assert three segments, HS256 header, `fragrances-api` issuer
    fn assert_session_token(&self) -> &Self;

    /// Assert the `sub` claim
    fn assert_for_subject(&self, subject: &str) -> &Self;

    /// Assert `exp - iat`
    fn assert_lifetime_secs(&self, seconds: i64) -> &Self;
}

fn decode_segment<T: for<'de> Deserialize<'de>>(token: &str, index: usize) -> T {
    let segment = token
        .split('.')
        .nth(index)
        .unwrap_or_else(|| panic!("JWT segment {index} missing"));
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .unwrap_or_else(|e| panic!("JWT segment {index} is not base64url: {e}"));
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|e| panic!("JWT segment {index} is not the expected JSON: {e}"))
}

impl SessionTokenAssertions for String {
    fn assert_session_token(&self) -> &Self {
        assert_eq!(
            self.split('.').count(),
            3,
            "JWT must have 3 parts (header.payload.signature)"
        );

        let header: JwtHeader = decode_segment(self, 0);
        assert_eq!(header.alg, "HS256", "Expected HS256 algorithm");

        let claims: JwtClaims = decode_segment(self, 1);
        assert_eq!(claims.iss, "fragrances-api", "Unexpected issuer");
        self
    }

    fn assert_for_subject(&self, subject: &str) -> &Self {
        let claims: JwtClaims = decode_segment(self, 1);
        assert_eq!(claims.sub, subject, "Token subject mismatch");
        self
    }

    fn assert_lifetime_secs(&self, seconds: i64) -> &Self {
        let claims: JwtClaims = decode_segment(self, 1);
        assert_eq!(claims.exp - claims.iat, seconds, "Token lifetime mismatch");
        self
    }
}
