//! PostgreSQL-backed session store.

use crate::errors::AuthError;
use crate::models::{SessionRecord, TokenRotation};
use crate::repositories::SessionStore;
use chrono::Utc;
use sqlx::PgPool;
use tracing::instrument;

/// Session store over the `user_sessions` table.
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply pending migrations from the workspace `migrations/` directory.
    pub async fn migrate(&self) -> Result<(), AuthError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AuthError::StoreUnavailable(format!("Failed to run migrations: {}", e)))
    }
}

#[async_trait::async_trait]
impl SessionStore for PgSessionStore {
    #[instrument(skip_all, name = "auth.store.get_by_id")]
    async fn get_by_id(&self, user_id: &str) -> Result<Option<SessionRecord>, AuthError> {
        let record = sqlx::query_as::<_, SessionRecord>(
            r#"
            SELECT user_id, access_token, refresh_token, expires_at, created_at, updated_at
            FROM user_sessions
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::StoreUnavailable(format!("Failed to fetch session by id: {}", e)))?;

        Ok(record)
    }

    #[instrument(skip_all, name = "auth.store.get_by_access_token")]
    async fn get_by_access_token(
        &self,
        access_token: &str,
    ) -> Result<Option<SessionRecord>, AuthError> {
        let record = sqlx::query_as::<_, SessionRecord>(
            r#"
            SELECT user_id, access_token, refresh_token, expires_at, created_at, updated_at
            FROM user_sessions
            WHERE access_token = $1
            "#,
        )
        .bind(access_token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AuthError::StoreUnavailable(format!("Failed to fetch session by access token: {}", e))
        })?;

        Ok(record)
    }

    #[instrument(skip_all, name = "auth.store.get_by_refresh_token")]
    async fn get_by_refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<Option<SessionRecord>, AuthError> {
        let record = sqlx::query_as::<_, SessionRecord>(
            r#"
            SELECT user_id, access_token, refresh_token, expires_at, created_at, updated_at
            FROM user_sessions
            WHERE refresh_token = $1
            "#,
        )
        .bind(refresh_token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AuthError::StoreUnavailable(format!("Failed to fetch session by refresh token: {}", e))
        })?;

        Ok(record)
    }

    #[instrument(skip_all, name = "auth.store.insert")]
    async fn insert(&self, record: &SessionRecord) -> Result<(), AuthError> {
        sqlx::query(
            r#"
            INSERT INTO user_sessions
                (user_id, access_token, refresh_token, expires_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id) DO UPDATE SET
                access_token = EXCLUDED.access_token,
                refresh_token = EXCLUDED.refresh_token,
                expires_at = EXCLUDED.expires_at,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&record.user_id)
        .bind(&record.access_token)
        .bind(&record.refresh_token)
        .bind(record.expires_at)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::StoreUnavailable(format!("Failed to insert session: {}", e)))?;

        Ok(())
    }

    #[instrument(skip_all, name = "auth.store.update")]
    async fn update(&self, record: &SessionRecord) -> Result<bool, AuthError> {
        let result = sqlx::query(
            r#"
            UPDATE user_sessions
            SET access_token = $2, refresh_token = $3, expires_at = $4, updated_at = $5
            WHERE user_id = $1
            "#,
        )
        .bind(&record.user_id)
        .bind(&record.access_token)
        .bind(&record.refresh_token)
        .bind(record.expires_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::StoreUnavailable(format!("Failed to update session: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip_all, name = "auth.store.rotate")]
    async fn rotate(
        &self,
        user_id: &str,
        current_refresh_token: &str,
        rotation: &TokenRotation,
    ) -> Result<Option<SessionRecord>, AuthError> {
        let record = sqlx::query_as::<_, SessionRecord>(
            r#"
            UPDATE user_sessions
            SET access_token = $3, refresh_token = $4, expires_at = $5, updated_at = $6
            WHERE user_id = $1 AND refresh_token = $2
            RETURNING user_id, access_token, refresh_token, expires_at, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(current_refresh_token)
        .bind(&rotation.access_token)
        .bind(&rotation.refresh_token)
        .bind(rotation.expires_at)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::StoreUnavailable(format!("Failed to rotate session: {}", e)))?;

        Ok(record)
    }

    #[instrument(skip_all, name = "auth.store.delete")]
    async fn delete(&self, user_id: &str) -> Result<bool, AuthError> {
        let result = sqlx::query("DELETE FROM user_sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::StoreUnavailable(format!("Failed to delete session: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), AuthError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
