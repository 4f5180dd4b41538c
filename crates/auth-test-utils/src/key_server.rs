//! Mock identity-provider key endpoint.
//!
//! Serves a JSON object mapping key id to PEM, with the caching headers
//! the real endpoint sends.

use crate::crypto_fixtures::{identity_public_key_pem, TEST_KID_1, TEST_KID_2};
use std::collections::HashMap;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the key set is served on.
pub const KEYS_PATH: &str = "/keys";

/// Default advertised cache lifetime.
pub const DEFAULT_MAX_AGE_SECS: u64 = 3600;

/// Wiremock-backed key endpoint.
pub struct MockKeyServer {
    server: MockServer,
}

impl MockKeyServer {
    /// Start a server with nothing mounted (every request answers 404).
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// URL to configure as `IDENTITY_KEYS_URL`.
    pub fn keys_url(&self) -> String {
        format!("{}{}", self.server.uri(), KEYS_PATH)
    }

    /// Serve both fixture public keys with the default cache lifetime.
    pub async fn serve_default_keys(&self) {
        self.serve_keys(&[(TEST_KID_1, 1), (TEST_KID_2, 2)], DEFAULT_MAX_AGE_SECS, 0)
            .await;
    }

    /// Serve the given `(kid, fixture keypair)` set.
    ///
    /// `Cache-Control: max-age` and `Age` are set from the arguments.
    pub async fn serve_keys(&self, keys: &[(&str, u8)], max_age: u64, age: u64) {
        Mock::given(method("GET"))
            .and(path(KEYS_PATH))
            .respond_with(key_set_response(keys, max_age, age))
            .mount(&self.server)
            .await;
    }

    /// Replace whatever is mounted with a new key set, as on provider
    /// key rotation.
    pub async fn rotate_to(&self, keys: &[(&str, u8)], max_age: u64) {
        self.server.reset().await;
        self.serve_keys(keys, max_age, 0).await;
    }

    /// Answer every key request with `status`.
    pub async fn fail_with(&self, status: u16) {
        self.server.reset().await;
        Mock::given(method("GET"))
            .and(path(KEYS_PATH))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Number of key set requests received so far.
    pub async fn fetch_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or(0)
    }
}

fn key_set_response(keys: &[(&str, u8)], max_age: u64, age: u64) -> ResponseTemplate {
    let body: HashMap<String, String> = keys
        .iter()
        .map(|(kid, n)| {
            let pem = identity_public_key_pem(*n).expect("fixture keypair should exist");
            ((*kid).to_string(), pem.to_string())
        })
        .collect();

    ResponseTemplate::new(200)
        .set_body_json(body)
        .insert_header(
            "cache-control",
            format!("public, max-age={max_age}, must-revalidate, no-transform").as_str(),
        )
        .insert_header("age", age.to_string().as_str())
}
