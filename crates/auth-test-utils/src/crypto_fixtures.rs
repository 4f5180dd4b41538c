//! Fixed RSA keys of the simulated identity provider.
//!
//! Two 2048-bit keypairs generated offline with OpenSSL. Private keys are
//! PKCS#1 PEM (what `EncodingKey::from_rsa_pem` reads); public keys are
//! SPKI PEM, the form the key endpoint serves.

use thiserror::Error;

/// Key id of fixture keypair 1.
pub const TEST_KID_1: &str = "identity-key-1";

/// Key id of fixture keypair 2.
pub const TEST_KID_2: &str = "identity-key-2";

/// Project the test identity tokens are issued for.
pub const TEST_PROJECT_ID: &str = "fragrance-catalog";

/// Issuer of the test identity tokens.
pub const TEST_ISSUER: &str = "https://securetoken.google.com/fragrance-catalog";

const PRIVATE_KEY_1: &str = include_str!("../fixtures/identity_key_1.pem");
const PRIVATE_KEY_2: &str = include_str!("../fixtures/identity_key_2.pem");
const PUBLIC_KEY_1: &str = include_str!("../fixtures/identity_pub_1.pem");
const PUBLIC_KEY_2: &str = include_str!("../fixtures/identity_pub_2.pem");

/// Test fixture error type
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("No fixture keypair {0}; available: 1, 2")]
    UnknownKey(u8),

    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),
}

/// PKCS#1 PEM private key of fixture keypair `n`.
pub fn identity_signing_key(n: u8) -> Result<&'static str, FixtureError> {
    match n {
        1 => Ok(PRIVATE_KEY_1),
        2 => Ok(PRIVATE_KEY_2),
        other => Err(FixtureError::UnknownKey(other)),
    }
}

/// SPKI PEM public key of fixture keypair `n`.
pub fn identity_public_key_pem(n: u8) -> Result<&'static str, FixtureError> {
    match n {
        1 => Ok(PUBLIC_KEY_1),
        2 => Ok(PUBLIC_KEY_2),
        other => Err(FixtureError::UnknownKey(other)),
    }
}
