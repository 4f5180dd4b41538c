//! Common utilities shared across the catalog authentication crates.

#![warn(clippy::pedantic)]

/// Module for bearer-credential parsing and token size limits
pub mod jwt;

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for the expiring key/value cache
pub mod ttl_cache;
