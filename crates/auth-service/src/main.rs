//! Catalog auth service
//!
//! Verifies identity-provider tokens and issues session tokens for the
//! fragrance catalog API.

use auth_service::auth::{IdentityVerifier, KeyResolver, TokenService};
use auth_service::config::Config;
use auth_service::observability::metrics::init_metrics_recorder;
use auth_service::repositories::{PgSessionStore, SessionStore};
use auth_service::routes::{self, AppState};
use auth_service::services::SessionService;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!("Starting catalog auth service");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        identity_project_id = %config.identity_project_id,
        identity_keys_url = %config.identity_keys_url,
        key_fetch_timeout_seconds = config.key_fetch_timeout_seconds,
        "Configuration loaded successfully"
    );

    // Metrics recorder must be installed before anything records
    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics recorder: {}", e);
        e
    })?;

    info!("Connecting to database...");
    let db_pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await
        .map_err(|e| {
            error!("Failed to connect to database: {}", e);
            e
        })?;

    let pg_store = PgSessionStore::new(db_pool);
    pg_store.migrate().await.map_err(|e| {
        error!("Failed to apply migrations: {}", e);
        e
    })?;
    let store: Arc<dyn SessionStore> = Arc::new(pg_store);

    info!("Database connection established");

    // Signing keys live only in this process; a restart ends every session
    let tokens = Arc::new(TokenService::generate().map_err(|e| {
        error!("Failed to generate session signing keys: {}", e);
        e
    })?);

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
        tokens,
        Arc::clone(&store),
        config.session_audience.clone(),
    ));

    let drain = Duration::from_secs(config.shutdown_drain_seconds);

    let state = Arc::new(AppState { sessions, store });

    let app = routes::build_routes(state, metrics_handle);

    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Catalog auth service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(drain))
    .await?;

    info!("Catalog auth service shutdown complete");

    Ok(())
}

/// Install the global subscriber. `LOG_FORMAT=json` selects JSON lines.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "auth_service=debug,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
/// Returns when a shutdown signal is received and the drain period is complete.
async fn shutdown_signal(drain: Duration) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    if drain.is_zero() {
        info!("Skipping drain period (SHUTDOWN_DRAIN_SECONDS=0)");
    } else {
        warn!("Draining connections for {} seconds...", drain.as_secs());
        tokio::time::sleep(drain).await;
        info!("Drain period complete");
    }
}
