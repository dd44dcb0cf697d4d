use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use warden_core::{NewRefreshToken, RefreshTokenRecord, RefreshTokenStore, StoreError};

/// In-memory refresh token ledger for tests and embedded use.
#[derive(Default, Clone)]
pub struct HashMapRefreshTokenStore {
    tokens: Arc<RwLock<HashMap<Uuid, RefreshTokenRecord>>>,
}

impl HashMapRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl RefreshTokenStore for HashMapRefreshTokenStore {
    async fn create(&self, token: NewRefreshToken) -> Result<RefreshTokenRecord, StoreError> {
        let mut tokens = self.tokens.write().await;
        if tokens.contains_key(&token.id) {
            return Err(StoreError::UniqueViolation("refresh_tokens_pkey".to_string()));
        }
        let record = RefreshTokenRecord {
            id: token.id,
            user_id: token.user_id,
            token_hash: token.token_hash,
            expires_at: token.expires_at,
            revoked_at: None,
            created_at: Utc::now(),
            user_agent: token.user_agent,
            ip_address: token.ip_address,
        };
        tokens.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<RefreshTokenRecord>, StoreError> {
        Ok(self.tokens.read().await.get(&id).cloned())
    }

    async fn revoke(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut tokens = self.tokens.write().await;
        match tokens.get_mut(&id) {
            Some(record) if record.revoked_at.is_none() => {
                record.revoked_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let mut tokens = self.tokens.write().await;
        let now = Utc::now();
        let mut count = 0;
        for record in tokens.values_mut() {
            if record.user_id == user_id && record.revoked_at.is_none() {
                record.revoked_at = Some(now);
                count += 1;
            }
        }
        Ok(count)
    }

    async fn get_valid_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<RefreshTokenRecord>, StoreError> {
        let tokens = self.tokens.read().await;
        let now = Utc::now();
        let mut valid: Vec<_> = tokens
            .values()
            .filter(|r| r.user_id == user_id && r.is_valid_at(now))
            .cloned()
            .collect();
        valid.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(valid)
    }

    async fn cleanup_expired(&self, retention: chrono::Duration) -> Result<u64, StoreError> {
        let cutoff = Utc::now() - retention;
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, r| r.expires_at >= cutoff);
        Ok((before - tokens.len()) as u64)
    }
}
