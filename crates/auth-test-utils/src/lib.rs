//! # Auth Test Utilities
//!
//! Shared test utilities for the catalog auth service.
//!
//! This crate provides:
//! - Fixed RSA identity-provider keys (generated offline, embedded)
//! - `IdentityTokenBuilder` for signed identity tokens
//! - `MockKeyServer` serving the provider's key endpoint
//! - `TestAuthServer` for end-to-end tests against the real router
//! - Session token assertions
//!
//! ## Usage
//!
//! ```rust,ignore
//! use auth_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let keys = MockKeyServer::start().await;
//!     keys.serve_default_keys().await;
//!
//!     let server = TestAuthServer::spawn(&keys.keys_url()).await?;
//!     let identity_token = IdentityTokenBuilder::new().for_user("alice").sign()?;
//!     // POST {server.url()}/api/v1/login with the identity token
//!     Ok(())
//! }
//! ```

pub mod assertions;
pub mod crypto_fixtures;
pub mod identity_tokens;
pub mod key_server;
pub mod server_harness;

// Re-export commonly used items
pub use assertions::*;
pub use crypto_fixtures::*;
pub use identity_tokens::*;
pub use key_server::*;
pub use server_harness::*;
