use chrono::{DateTime, Utc};
use secrecy::Secret;
use uuid::Uuid;

use crate::domain::email::Email;

/// A user account.
///
/// `password_hash` is absent for accounts created through an OAuth provider;
/// such accounts cannot log in with a password until one is set. Accounts
/// are never hard-deleted, only stamped with `deleted_at`.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: Email,
    pub name: String,
    pub password_hash: Option<Secret<String>>,
    pub avatar_url: Option<String>,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    /// Whether password verification is even applicable for this account.
    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// Fields supplied when creating a user; ids and timestamps are assigned by
/// the store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub name: String,
    pub password_hash: Option<Secret<String>>,
    pub email_verified: bool,
}

#[cfg(test)]
mod tests {
    use secrecy::Secret;

    use super::*;

    fn user(password_hash: Option<&str>, deleted: bool) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: Email::parse(Secret::from("user@example.com".to_string())).unwrap(),
            name: "Test User".to_string(),
            password_hash: password_hash.map(|h| Secret::from(h.to_string())),
            avatar_url: None,
            email_verified: false,
            created_at: now,
            updated_at: now,
            deleted_at: deleted.then_some(now),
        }
    }

    #[test]
    fn test_has_password() {
        assert!(user(Some("$argon2id$..."), false).has_password());
        assert!(!user(None, false).has_password());
    }

    #[test]
    fn test_is_active() {
        assert!(user(None, false).is_active());
        assert!(!user(None, true).is_active());
    }
}
