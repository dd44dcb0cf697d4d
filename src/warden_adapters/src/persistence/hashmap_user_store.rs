use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use secrecy::Secret;
use tokio::sync::RwLock;
use uuid::Uuid;

use warden_core::{Email, NewUser, StoreError, User, UserStore};

/// In-memory user store for tests and embedded use. Clones share state
/// through the inner `Arc<RwLock>`.
#[derive(Default, Clone)]
pub struct HashMapUserStore {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl HashMapUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl UserStore for HashMapUserStore {
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        // Email values are normalized to lowercase, so plain equality is
        // the case-insensitive uniqueness check.
        if users
            .values()
            .any(|u| u.deleted_at.is_none() && u.email == new_user.email)
        {
            return Err(StoreError::UniqueViolation(
                "users_email_lower_key".to_string(),
            ));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: new_user.email,
            name: new_user.name,
            password_hash: new_user.password_hash,
            avatar_url: None,
            email_verified: new_user.email_verified,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .get(&id)
            .filter(|u| u.deleted_at.is_none())
            .cloned())
    }

    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.deleted_at.is_none() && u.email == *email)
            .cloned())
    }

    async fn email_exists(&self, email: &Email) -> Result<bool, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .any(|u| u.deleted_at.is_none() && u.email == *email))
    }

    async fn update_password(
        &self,
        id: Uuid,
        password_hash: Secret<String>,
    ) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        match users.get_mut(&id).filter(|u| u.deleted_at.is_none()) {
            Some(user) => {
                user.password_hash = Some(password_hash);
                user.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn verify_email(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        match users.get_mut(&id).filter(|u| u.deleted_at.is_none()) {
            Some(user) => {
                user.email_verified = true;
                user.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_profile(
        &self,
        id: Uuid,
        name: Option<String>,
        avatar_url: Option<String>,
    ) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().await;
        match users.get_mut(&id).filter(|u| u.deleted_at.is_none()) {
            Some(user) => {
                if let Some(name) = name {
                    user.name = name;
                }
                if let Some(avatar_url) = avatar_url {
                    user.avatar_url = Some(avatar_url);
                }
                user.updated_at = Utc::now();
                Ok(Some(user.clone()))
            }
            None => Ok(None),
        }
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        match users.get_mut(&id).filter(|u| u.deleted_at.is_none()) {
            Some(user) => {
                let now = Utc::now();
                user.deleted_at = Some(now);
                user.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
