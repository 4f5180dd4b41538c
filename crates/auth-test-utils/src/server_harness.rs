//! Test server harness for E2E testing
//!
//! Provides `TestAuthServer` for spawning the real router in-process with
//! an in-memory session store.

use crate::crypto_fixtures::TEST_PROJECT_ID;
use auth_service::auth::{IdentityVerifier, KeyResolver, TokenService};
use auth_service::config::Config;
use auth_service::repositories::InMemorySessionStore;
use auth_service::routes::{self, AppState};
use auth_service::services::SessionService;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::task::JoinHandle;

// The global recorder can be installed once per process; tests share a
// handle that is never installed.
static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn test_metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| PrometheusBuilder::new().build_recorder().handle())
        .clone()
}

/// Test harness for spawning the auth service in E2E tests.
///
/// # Example
/// ```rust,ignore
/// let keys = MockKeyServer::start().await;
/// keys.serve_default_keys().await;
/// let server = TestAuthServer::spawn(&keys.keys_url()).await?;
///
/// let response = reqwest::Client::new()
///     .get(format!("{}/health", server.url()))
///     .send()
///     .await?;
/// assert_eq!(response.status(), 200);
/// ```
pub struct TestAuthServer {
    addr: SocketAddr,
    store: Arc<InMemorySessionStore>,
    tokens: Arc<TokenService>,
    config: Config,
    _handle: JoinHandle<()>,
}

impl TestAuthServer {
    /// Spawn a server that trusts keys from `keys_url`.
    ///
    /// Binds to a random port on 127.0.0.1.
    pub async fn spawn(keys_url: &str) -> Result<Self, anyhow::Error> {
        let vars = HashMap::from([
            (
                "DATABASE_URL".to_string(),
                "postgresql://unused/in-memory".to_string(),
            ),
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            (
                "IDENTITY_PROJECT_ID".to_string(),
                TEST_PROJECT_ID.to_string(),
            ),
            ("IDENTITY_KEYS_URL".to_string(), keys_url.to_string()),
            ("KEY_FETCH_TIMEOUT_SECONDS".to_string(), "2".to_string()),
        ]);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let store = Arc::new(InMemorySessionStore::new());
        let tokens = Arc::new(
            TokenService::generate()
                .map_err(|e| anyhow::anyhow!("Failed to generate signing keys: {}", e))?,
        );

        let key_resolver = Arc::new(KeyResolver::new(
            config.identity_keys_url.clone(),
            Duration::from_secs(config.key_fetch_timeout_seconds),
        ));
        let identity_verifier = Arc::new(IdentityVerifier::new(
            key_resolver,
            config.identity_project_id.clone(),
            config.identity_issuer.clone(),
        ));
        let sessions = Arc::new(SessionService::new(
            identity_verifier,
            Arc::clone(&tokens),
            store.clone(),
            config.session_audience.clone(),
        ));

        let state = Arc::new(AppState {
            sessions,
            store: store.clone(),
        });

        let app = routes::build_routes(state, test_metrics_handle());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            store,
            tokens,
            config,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Session store backing the server.
    pub fn store(&self) -> &Arc<InMemorySessionStore> {
        &self.store
    }

    /// Token service holding the server's signing keys.
    pub fn tokens(&self) -> &Arc<TokenService> {
        &self.tokens
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for TestAuthServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
