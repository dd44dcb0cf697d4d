use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use warden_core::{NewOAuthAccount, OAuthAccount, OAuthAccountStore, OAuthProvider, StoreError};

/// In-memory OAuth link registry for tests and embedded use.
#[derive(Default, Clone)]
pub struct HashMapOAuthAccountStore {
    accounts: Arc<RwLock<HashMap<Uuid, OAuthAccount>>>,
}

impl HashMapOAuthAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl OAuthAccountStore for HashMapOAuthAccountStore {
    async fn get_by_provider(
        &self,
        provider: OAuthProvider,
        provider_user_id: &str,
    ) -> Result<Option<OAuthAccount>, StoreError> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .find(|a| a.provider == provider && a.provider_user_id == provider_user_id)
            .cloned())
    }

    async fn get_for_user(&self, user_id: Uuid) -> Result<Vec<OAuthAccount>, StoreError> {
        let accounts = self.accounts.read().await;
        let mut linked: Vec<_> = accounts
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        linked.sort_by_key(|a| a.created_at);
        Ok(linked)
    }

    async fn has_provider(
        &self,
        user_id: Uuid,
        provider: OAuthProvider,
    ) -> Result<bool, StoreError> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .any(|a| a.user_id == user_id && a.provider == provider))
    }

    async fn create(&self, link: NewOAuthAccount) -> Result<OAuthAccount, StoreError> {
        let mut accounts = self.accounts.write().await;
        if accounts
            .values()
            .any(|a| a.provider == link.provider && a.provider_user_id == link.provider_user_id)
        {
            return Err(StoreError::UniqueViolation(
                "oauth_accounts_provider_provider_user_id_key".to_string(),
            ));
        }

        let account = OAuthAccount {
            id: Uuid::new_v4(),
            user_id: link.user_id,
            provider: link.provider,
            provider_user_id: link.provider_user_id,
            email: link.email,
            created_at: Utc::now(),
        };
        accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut accounts = self.accounts.write().await;
        Ok(accounts.remove(&id).is_some())
    }

    async fn delete_for_user(
        &self,
        user_id: Uuid,
        provider: OAuthProvider,
    ) -> Result<bool, StoreError> {
        let mut accounts = self.accounts.write().await;
        let before = accounts.len();
        accounts.retain(|_, a| !(a.user_id == user_id && a.provider == provider));
        Ok(accounts.len() < before)
    }
}
