//! In-process session store.

use crate::errors::AuthError;
use crate::models::{SessionRecord, TokenRotation};
use crate::repositories::SessionStore;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Session store holding records in a process-local map.
#[derive(Default)]
pub struct InMemorySessionStore {
    records: RwLock<HashMap<String, SessionRecord>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_by_id(&self, user_id: &str) -> Result<Option<SessionRecord>, AuthError> {
        Ok(self.records.read().await.get(user_id).cloned())
    }

    async fn get_by_access_token(
        &self,
        access_token: &str,
    ) -> Result<Option<SessionRecord>, AuthError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .find(|record| record.access_token == access_token)
            .cloned())
    }

    async fn get_by_refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<Option<SessionRecord>, AuthError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .find(|record| record.refresh_token == refresh_token)
            .cloned())
    }

    async fn insert(&self, record: &SessionRecord) -> Result<(), AuthError> {
        let mut records = self.records.write().await;
        let mut record = record.clone();
        if let Some(existing) = records.get(&record.user_id) {
            record.created_at = existing.created_at;
        }
        records.insert(record.user_id.clone(), record);
        Ok(())
    }

    async fn update(&self, record: &SessionRecord) -> Result<bool, AuthError> {
        let mut records = self.records.write().await;
        match records.get_mut(&record.user_id) {
            Some(existing) => {
                existing.access_token = record.access_token.clone();
                existing.refresh_token = record.refresh_token.clone();
                existing.expires_at = record.expires_at;
                existing.updated_at = record.updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn rotate(
        &self,
        user_id: &str,
        current_refresh_token: &str,
        rotation: &TokenRotation,
    ) -> Result<Option<SessionRecord>, AuthError> {
        let mut records = self.records.write().await;
        match records.get_mut(user_id) {
            Some(existing) if existing.refresh_token == current_refresh_token => {
                existing.access_token = rotation.access_token.clone();
                existing.refresh_token = rotation.refresh_token.clone();
                existing.expires_at = rotation.expires_at;
                existing.updated_at = Utc::now();
                Ok(Some(existing.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete(&self, user_id: &str) -> Result<bool, AuthError> {
        Ok(self.records.write().await.remove(user_id).is_some())
    }

    async fn ping(&self) -> Result<(), AuthError> {
        Ok(())
    }
}
