use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use warden_core::{NewPasswordResetToken, PasswordResetStore, PasswordResetTokenRecord, StoreError};

/// In-memory password reset ledger for tests and embedded use.
#[derive(Default, Clone)]
pub struct HashMapPasswordResetStore {
    tokens: Arc<RwLock<HashMap<Uuid, PasswordResetTokenRecord>>>,
}

impl HashMapPasswordResetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl PasswordResetStore for HashMapPasswordResetStore {
    async fn issue(
        &self,
        token: NewPasswordResetToken,
    ) -> Result<PasswordResetTokenRecord, StoreError> {
        // One write lock spans the invalidate and the insert, matching the
        // transactional guarantee of the Postgres implementation.
        let mut tokens = self.tokens.write().await;
        let now = Utc::now();
        for record in tokens.values_mut() {
            if record.user_id == token.user_id && record.used_at.is_none() {
                record.used_at = Some(now);
            }
        }

        let record = PasswordResetTokenRecord {
            id: token.id,
            user_id: token.user_id,
            token_hash: token.token_hash,
            expires_at: token.expires_at,
            used_at: None,
            created_at: now,
        };
        tokens.insert(record.id, record.clone());
        Ok(record)
    }

    async fn invalidate_all_for_user(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let mut tokens = self.tokens.write().await;
        let now = Utc::now();
        let mut count = 0;
        for record in tokens.values_mut() {
            if record.user_id == user_id && record.used_at.is_none() {
                record.used_at = Some(now);
                count += 1;
            }
        }
        Ok(count)
    }

    async fn get_valid_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<PasswordResetTokenRecord>, StoreError> {
        let tokens = self.tokens.read().await;
        let now = Utc::now();
        Ok(tokens
            .values()
            .filter(|r| r.user_id == user_id && r.is_valid_at(now))
            .max_by_key(|r| r.created_at)
            .cloned())
    }

    async fn mark_used(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut tokens = self.tokens.write().await;
        match tokens.get_mut(&id) {
            Some(record) if record.used_at.is_none() => {
                record.used_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn cleanup_expired(&self, retention: chrono::Duration) -> Result<u64, StoreError> {
        let cutoff = Utc::now() - retention;
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, r| r.expires_at >= cutoff);
        Ok((before - tokens.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use secrecy::Secret;

    use super::*;

    fn new_token(user_id: Uuid) -> NewPasswordResetToken {
        NewPasswordResetToken {
            id: Uuid::new_v4(),
            user_id,
            token_hash: Secret::from("hash".to_string()),
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    #[tokio::test]
    async fn test_issue_retires_every_outstanding_token_for_the_user() {
        let store = HashMapPasswordResetStore::new();
        let user_id = Uuid::new_v4();

        let first = store.issue(new_token(user_id)).await.unwrap();
        let second = store.issue(new_token(user_id)).await.unwrap();

        let valid = store.get_valid_for_user(user_id).await.unwrap().unwrap();
        assert_eq!(valid.id, second.id);
        assert!(!store.mark_used(first.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_issue_leaves_other_users_tokens_alone() {
        let store = HashMapPasswordResetStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        store.issue(new_token(alice)).await.unwrap();
        store.issue(new_token(bob)).await.unwrap();

        assert!(store.get_valid_for_user(alice).await.unwrap().is_some());
        assert!(store.get_valid_for_user(bob).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_mark_used_consumes_exactly_once() {
        let store = HashMapPasswordResetStore::new();
        let record = store.issue(new_token(Uuid::new_v4())).await.unwrap();

        assert!(store.mark_used(record.id).await.unwrap());
        assert!(!store.mark_used(record.id).await.unwrap());
    }
}
