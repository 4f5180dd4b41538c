//! Identity token verification.
//!
//! Identity tokens are RSA-signed JWTs issued by the external identity
//! provider. Verification order:
//!
//! 1. Size check and header parse
//! 2. Algorithm must be in the RSA family; anything else is rejected
//!    before a key is looked up
//! 3. `kid` resolved through the [`KeyResolver`]
//! 4. Signature verified
//! 5. Claims checked together; any failing condition rejects the token

use crate::auth::claims::IdentityClaims;
use crate::auth::key_resolver::KeyResolver;
use crate::auth::{map_decode_error, parse_header};
use crate::errors::AuthError;
use crate::observability::metrics;
use chrono::Utc;
use common::jwt::check_token_size;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::instrument;

/// Signing algorithms accepted on identity tokens.
const ACCEPTED_ALGORITHMS: [Algorithm; 3] = [Algorithm::RS256, Algorithm::RS384, Algorithm::RS512];

/// Verifies identity tokens against the provider's published keys.
pub struct IdentityVerifier {
    key_resolver: Arc<KeyResolver>,

    /// Trusted project; must equal the `aud` claim.
    project_id: String,

    /// Expected `iss` claim.
    issuer: String,
}

impl IdentityVerifier {
    pub fn new(key_resolver: Arc<KeyResolver>, project_id: String, issuer: String) -> Self {
        Self {
            key_resolver,
            project_id,
            issuer,
        }
    }

    /// Verify an identity token and return its claims.
    ///
    /// # Errors
    ///
    /// - `AuthError::MalformedCredential` for oversized or unparsable tokens
    /// - `AuthError::AlgorithmMismatch` for non-RSA signing algorithms
    /// - `AuthError::KeyNotFound` / `AuthError::KeyFetchFailed` from key lookup
    /// - `AuthError::InvalidSignature` if the signature does not verify
    /// - `AuthError::ClaimsInvalid` if any claim check fails
    #[instrument(skip_all, name = "auth.identity.verify")]
    pub async fn verify(&self, token: &str) -> Result<IdentityClaims, AuthError> {
        let result = self.verify_inner(token).await;
        match &result {
            Ok(_) => metrics::record_identity_verification("success", None),
            Err(e) => metrics::record_identity_verification("error", Some(e.category())),
        }
        result
    }

    async fn verify_inner(&self, token: &str) -> Result<IdentityClaims, AuthError> {
        check_token_size(token)?;

        let header = parse_header(token)?;

        if !ACCEPTED_ALGORITHMS.contains(&header.alg) {
            tracing::warn!(
                target: "auth.identity",
                alg = ?header.alg,
                "Identity token signed with unexpected algorithm"
            );
            return Err(AuthError::AlgorithmMismatch);
        }

        let kid = header.kid.filter(|kid| !kid.is_empty()).ok_or_else(|| {
            tracing::debug!(target: "auth.identity", "Identity token has no key id");
            AuthError::KeyNotFound
        })?;

        let pem = self.key_resolver.resolve(&kid).await?;
        let decoding_key = DecodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| {
            tracing::error!(target: "auth.identity", kid = %kid, error = %e, "Published key is not a usable RSA key");
            map_decode_error(&e)
        })?;

        // Time and audience checks happen in check_claims so they fail as one
        let mut validation = Validation::new(header.alg);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        let token_data = decode::<IdentityClaims>(token, &decoding_key, &validation).map_err(|e| {
            tracing::debug!(target: "auth.identity", error = %e, "Identity token rejected");
            map_decode_error(&e)
        })?;

        let mut claims = token_data.claims;
        self.check_claims(&claims, Utc::now().timestamp())?;
        claims.kid = kid;

        tracing::debug!(target: "auth.identity", kid = %claims.kid, "Identity token verified");
        Ok(claims)
    }

    fn check_claims(&self, claims: &IdentityClaims, now: i64) -> Result<(), AuthError> {
        let valid = claims.exp > now
            && claims.iat <= now
            && claims.aud == self.project_id
            && claims.iss == self.issuer
            && !claims.sub.is_empty()
            && claims.sub == claims.user_id;

        if valid {
            Ok(())
        } else {
            tracing::debug!(target: "auth.identity", "Identity token claims rejected");
            Err(AuthError::ClaimsInvalid)
        }
    }
}
