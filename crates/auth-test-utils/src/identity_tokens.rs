//! Builder for identity tokens signed with the fixture keys.

use crate::crypto_fixtures::{
    identity_signing_key, FixtureError, TEST_ISSUER, TEST_KID_1, TEST_PROJECT_ID,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::json;

/// Builder for RS-signed identity tokens.
///
/// Defaults produce a token that verifies against the fixture key set
/// served by [`crate::MockKeyServer::serve_default_keys`].
///
/// # Example
/// ```rust,ignore
/// let token = IdentityTokenBuilder::new()
///     .for_user("alice")
///     .with_kid(TEST_KID_2)
///     .signed_with_key(2)
///     .sign()?;
/// ```
pub struct IdentityTokenBuilder {
    sub: String,
    user_id: Option<String>,
    aud: String,
    iss: String,
    kid: Option<String>,
    key: u8,
    algorithm: Algorithm,
    iat: i64,
    exp: i64,
}

impl IdentityTokenBuilder {
    /// Create a new token builder with defaults
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            sub: "test-user".to_string(),
            user_id: None,
            aud: TEST_PROJECT_ID.to_string(),
            iss: TEST_ISSUER.to_string(),
            kid: Some(TEST_KID_1.to_string()),
            key: 1,
            algorithm: Algorithm::RS256,
            iat: (now - Duration::seconds(5)).timestamp(),
            exp: (now + Duration::seconds(3600)).timestamp(),
        }
    }

    /// Set `sub` (and `user_id`, unless overridden)
    pub fn for_user(mut self, subject: &str) -> Self {
        self.sub = subject.to_string();
        self
    }

    /// Set a `user_id` claim that may differ from `sub`
    pub fn with_user_id(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    pub fn with_audience(mut self, aud: &str) -> Self {
        self.aud = aud.to_string();
        self
    }

    pub fn with_issuer(mut self, iss: &str) -> Self {
        self.iss = iss.to_string();
        self
    }

    /// Set the header `kid`
    pub fn with_kid(mut self, kid: &str) -> Self {
        self.kid = Some(kid.to_string());
        self
    }

    /// Omit the header `kid`
    pub fn without_kid(mut self) -> Self {
        self.kid = None;
        self
    }

    /// Sign with fixture keypair `n` (1 or 2)
    pub fn signed_with_key(mut self, n: u8) -> Self {
        self.key = n;
        self
    }

    /// Any RSA algorithm
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Expired one minute ago
    pub fn expired(mut self) -> Self {
        let now = Utc::now();
        self.iat = (now - Duration::seconds(3600)).timestamp();
        self.exp = (now - Duration::seconds(60)).timestamp();
        self
    }

    /// Issued one minute in the future
    pub fn issued_in_future(mut self) -> Self {
        self.iat = (Utc::now() + Duration::seconds(60)).timestamp();
        self
    }

    /// Claims as a JSON value
    pub fn claims(&self) -> serde_json::Value {
        json!({
            "sub": self.sub,
            "user_id": self.user_id.clone().unwrap_or_else(|| self.sub.clone()),
            "aud": self.aud,
            "iss": self.iss,
            "iat": self.iat,
            "exp": self.exp,
        })
    }

    /// Encode and sign the token
    pub fn sign(self) -> Result<String, FixtureError> {
        let pem = identity_signing_key(self.key)?;
        let key = EncodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| FixtureError::Crypto(format!("Invalid fixture key: {e}")))?;

        let mut header = Header::new(self.algorithm);
        header.kid = self.kid.clone();

        encode(&header, &self.claims(), &key)
            .map_err(|e| FixtureError::Crypto(format!("Failed to sign identity token: {e}")))
    }
}

impl Default for IdentityTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Flip one bit of the decoded signature, keeping header and payload.
pub fn flip_signature_byte(token: &str) -> String {
    let (signing_input, signature) = token
        .rsplit_once('.')
        .expect("token should have a signature segment");

    let mut bytes = URL_SAFE_NO_PAD
        .decode(signature)
        .expect("signature should be base64url");
    let first = bytes.first_mut().expect("signature should not be empty");
    *first ^= 0x01;

    format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(bytes))
}
