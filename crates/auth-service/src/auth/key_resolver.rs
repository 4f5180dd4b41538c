//! Resolver for the identity provider's public signing keys.
//!
//! The key endpoint returns a JSON object mapping key ids to PEM-encoded
//! key material. Keys are cached for the lifetime advertised by the
//! response (`Cache-Control: max-age` minus `Age`). A response without a
//! usable lifetime is treated as a failed fetch.
//!
//! Every successful fetch replaces the whole cache, so a key the provider
//! rotated out stops resolving after the next fetch even if it was not
//! the key being looked up.

use crate::errors::AuthError;
use crate::observability::metrics;
use common::ttl_cache::{Expiration, TtlCache};
use reqwest::header::{HeaderMap, AGE, CACHE_CONTROL};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::instrument;

/// Error detail for a response whose cache lifetime cannot be used.
const EXPIRATION_NOT_VALID: &str = "Certificate expiration time not valid";

/// Fetches and caches identity-provider keys by key id.
pub struct KeyResolver {
    /// URL of the key endpoint.
    keys_url: String,

    http_client: reqwest::Client,

    /// Key id -> PEM key material.
    cache: TtlCache<String, String>,

    /// Serializes refreshes so concurrent misses fetch once.
    refresh_guard: Mutex<()>,
}

impl KeyResolver {
    /// Create a resolver for `keys_url` with the given transport deadline.
    pub fn new(keys_url: String, fetch_timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            keys_url,
            http_client,
            cache: TtlCache::new(Expiration::Never),
            refresh_guard: Mutex::new(()),
        }
    }

    /// Resolve the key material for `kid`.
    ///
    /// # Errors
    ///
    /// - `AuthError::KeyFetchFailed` if the endpoint cannot be reached,
    ///   answers with a non-OK status, returns malformed JSON, or does not
    ///   advertise a positive cache lifetime.
    /// - `AuthError::KeyNotFound` if `kid` is absent from a freshly fetched
    ///   key set.
    #[instrument(skip_all, name = "auth.jwks.resolve", fields(kid = %kid))]
    pub async fn resolve(&self, kid: &str) -> Result<String, AuthError> {
        if let Some(key) = self.cache.get(kid).await {
            metrics::record_key_cache_lookup("hit");
            return Ok(key);
        }

        let _guard = self.refresh_guard.lock().await;

        // Another request may have refreshed while we waited
        if let Some(key) = self.cache.get(kid).await {
            metrics::record_key_cache_lookup("hit");
            return Ok(key);
        }
        metrics::record_key_cache_lookup("miss");

        self.refresh().await?;

        match self.cache.get(kid).await {
            Some(key) => Ok(key),
            None => {
                tracing::warn!(target: "auth.jwks", kid = %kid, "Key id not present in fetched key set");
                Err(AuthError::KeyNotFound)
            }
        }
    }

    /// Fetch the key set and replace the cache contents with it.
    async fn refresh(&self) -> Result<(), AuthError> {
        let start = Instant::now();
        let result = self.fetch().await;
        let status = if result.is_ok() { "success" } else { "error" };
        metrics::record_key_fetch(status, start.elapsed());

        let (keys, ttl) = result?;
        let key_count = keys.len();
        self.cache.replace_all(keys, ttl).await;

        tracing::info!(
            target: "auth.jwks",
            key_count = key_count,
            ttl_seconds = ttl.as_secs(),
            "Identity key cache refreshed"
        );
        Ok(())
    }

    async fn fetch(&self) -> Result<(HashMap<String, String>, Duration), AuthError> {
        tracing::debug!(target: "auth.jwks", url = %self.keys_url, "Fetching identity keys");

        let response = self
            .http_client
            .get(&self.keys_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "auth.jwks", error = %e, "Failed to fetch identity keys");
                AuthError::KeyFetchFailed(format!("transport error: {e}"))
            })?;

        if response.status() != reqwest::StatusCode::OK {
            tracing::error!(
                target: "auth.jwks",
                status = %response.status(),
                "Key endpoint returned error"
            );
            return Err(AuthError::KeyFetchFailed("Response not OK".to_string()));
        }

        let ttl = cache_lifetime(response.headers())?;

        let keys: HashMap<String, String> = response.json().await.map_err(|e| {
            tracing::error!(target: "auth.jwks", error = %e, "Failed to parse key set");
            AuthError::KeyFetchFailed(format!("malformed key set: {e}"))
        })?;

        Ok((keys, ttl))
    }
}

/// Remaining cache lifetime of a response: `max-age` minus `Age`.
///
/// A missing `Age` header counts as zero (RFC 9111 section 4.2.3), so a
/// response served straight from the origin is cached for its full
/// `max-age` instead of being rejected. A missing `max-age`, an
/// unparsable `Age`, or a non-positive remainder is an error.
fn cache_lifetime(headers: &HeaderMap) -> Result<Duration, AuthError> {
    let max_age = headers
        .get_all(CACHE_CONTROL)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(parse_max_age)
        .ok_or_else(|| {
            tracing::error!(target: "auth.jwks", "Key response has no max-age directive");
            AuthError::KeyFetchFailed(EXPIRATION_NOT_VALID.to_string())
        })?;

    let age = match headers.get(AGE) {
        None => 0,
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .ok_or_else(|| {
                tracing::error!(target: "auth.jwks", "Key response has an unparsable Age header");
                AuthError::KeyFetchFailed(EXPIRATION_NOT_VALID.to_string())
            })?,
    };

    let remaining = max_age.saturating_sub(age);
    if remaining == 0 {
        tracing::error!(
            target: "auth.jwks",
            max_age = max_age,
            age = age,
            "Key response is already stale"
        );
        return Err(AuthError::KeyFetchFailed(EXPIRATION_NOT_VALID.to_string()));
    }

    Ok(Duration::from_secs(remaining))
}

/// Extract the `max-age` directive from one `Cache-Control` header value.
fn parse_max_age(cache_control: &str) -> Option<u64> {
    cache_control.split(',').find_map(|directive| {
        let (name, value) = directive.split_once('=')?;
        if name.trim().eq_ignore_ascii_case("max-age") {
            value.trim().trim_matches('"').parse().ok()
        } else {
            None
        }
    })
}
