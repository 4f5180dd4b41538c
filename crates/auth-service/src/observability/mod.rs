//! Observability for the auth service.
//!
//! Instrumented functions use `#[instrument(skip_all)]`; tokens, keys and
//! user identifiers are never recorded as span fields or metric labels.

pub mod metrics;
