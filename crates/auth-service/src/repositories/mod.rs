//! Session persistence.
//!
//! [`SessionStore`] is the seam between session validation and storage.
//! [`sessions::PgSessionStore`] is the production implementation;
//! [`in_memory::InMemorySessionStore`] backs tests and local runs.

pub mod in_memory;
pub mod sessions;

pub use in_memory::InMemorySessionStore;
pub use sessions::PgSessionStore;

use crate::errors::AuthError;
use crate::models::{SessionRecord, TokenRotation};

/// Storage of one [`SessionRecord`] per user.
///
/// Each call is atomic per user id: a concurrent reader never observes a
/// partially written record.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    async fn get_by_id(&self, user_id: &str) -> Result<Option<SessionRecord>, AuthError>;

    async fn get_by_access_token(
        &self,
        access_token: &str,
    ) -> Result<Option<SessionRecord>, AuthError>;

    async fn get_by_refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<Option<SessionRecord>, AuthError>;

    /// Create the user's record, overwriting any existing one.
    /// `created_at` of an existing record is kept.
    async fn insert(&self, record: &SessionRecord) -> Result<(), AuthError>;

    /// Overwrite an existing record. Returns `false` if none exists.
    async fn update(&self, record: &SessionRecord) -> Result<bool, AuthError>;

    /// Replace the token pair only while `current_refresh_token` is still
    /// the stored one. Returns the new record, or `None` if the record is
    /// gone or was rotated by someone else.
    async fn rotate(
        &self,
        user_id: &str,
        current_refresh_token: &str,
        rotation: &TokenRotation,
    ) -> Result<Option<SessionRecord>, AuthError>;

    /// Remove the user's record. Returns `false` if none existed.
    async fn delete(&self, user_id: &str) -> Result<bool, AuthError>;

    /// Check the store is reachable.
    async fn ping(&self) -> Result<(), AuthError>;
}
