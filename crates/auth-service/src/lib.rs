//! Catalog auth service library.
//!
//! Bearer-token authentication for the catalog API:
//!
//! - identity tokens issued by an external provider are verified against
//!   its published, cached signing keys
//! - a verified identity is exchanged for a pair of HS256 session tokens
//!   (24h access, 168h refresh) signed with process-local keys
//! - one session record per user decides which tokens are current
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> services/*.rs -> auth/*.rs, repositories/*.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - key resolver, identity verifier, session token service
//! - `config` - service configuration from environment
//! - `errors` - error taxonomy with HTTP status mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - session authorization and HTTP metrics
//! - `models` - session records and response bodies
//! - `observability` - Prometheus metrics
//! - `repositories` - session store trait and implementations
//! - `routes` - Axum router setup
//! - `services` - session lifecycle

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
