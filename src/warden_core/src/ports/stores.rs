use async_trait::async_trait;
use chrono::Duration;
use secrecy::Secret;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{
    email::Email,
    session::{
        ClientMeta, FailedWindow, LoginAttempt, NewOAuthAccount, NewPasswordResetToken,
        NewRefreshToken, OAuthAccount, OAuthProvider, PasswordResetTokenRecord,
        RefreshTokenRecord,
    },
    user::{NewUser, User},
};

/// Storage failures, tagged by kind at the persistence boundary.
///
/// Adapters translate their driver's error types into this enum; the
/// application layer maps each tag into the user-facing error taxonomy and
/// never inspects driver types itself.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),
    #[error("check constraint violated: {0}")]
    CheckViolation(String),
    #[error("storage connection failure: {0}")]
    ConnectionFailure(String),
    #[error("storage call timed out")]
    Timeout,
    #[error("storage error: {0}")]
    Other(String),
}

/// User records and password hashes.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create a user. Fails with `UniqueViolation` when the email is already
    /// taken (case-insensitively) by a non-deleted account.
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError>;

    /// Soft-deleted users are not returned.
    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, StoreError>;

    async fn email_exists(&self, email: &Email) -> Result<bool, StoreError>;

    /// Returns false when the user does not exist (or is deleted).
    async fn update_password(
        &self,
        id: Uuid,
        password_hash: Secret<String>,
    ) -> Result<bool, StoreError>;

    async fn verify_email(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn update_profile(
        &self,
        id: Uuid,
        name: Option<String>,
        avatar_url: Option<String>,
    ) -> Result<Option<User>, StoreError>;

    async fn soft_delete(&self, id: Uuid) -> Result<bool, StoreError>;
}

/// The refresh token ledger. Stores hashes only.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn create(&self, token: NewRefreshToken) -> Result<RefreshTokenRecord, StoreError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<RefreshTokenRecord>, StoreError>;

    /// Compare-and-swap on `revoked_at IS NULL`. Returns false when the
    /// token was already revoked (or never existed), which rotation uses to
    /// reject replays.
    async fn revoke(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Bulk revocation for logout-all and password reset. Idempotent.
    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, StoreError>;

    async fn get_valid_for_user(&self, user_id: Uuid)
    -> Result<Vec<RefreshTokenRecord>, StoreError>;

    /// Delete rows expired longer than `retention` ago. Housekeeping only.
    async fn cleanup_expired(&self, retention: Duration) -> Result<u64, StoreError>;
}

/// The password reset token ledger.
#[async_trait]
pub trait PasswordResetStore: Send + Sync {
    /// Invalidate every outstanding token for the user and insert the new
    /// one, atomically with respect to concurrent issues for the same user.
    async fn issue(
        &self,
        token: NewPasswordResetToken,
    ) -> Result<PasswordResetTokenRecord, StoreError>;

    async fn invalidate_all_for_user(&self, user_id: Uuid) -> Result<u64, StoreError>;

    /// Most recent unused, unexpired token for the user.
    async fn get_valid_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<PasswordResetTokenRecord>, StoreError>;

    /// Compare-and-swap on `used_at IS NULL`; false means another request
    /// consumed the token first.
    async fn mark_used(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn cleanup_expired(&self, retention: Duration) -> Result<u64, StoreError>;
}

/// Append-only log of login attempts driving the sliding-window lockout.
#[async_trait]
pub trait LoginAttemptStore: Send + Sync {
    async fn record(
        &self,
        email: &Email,
        success: bool,
        meta: &ClientMeta,
    ) -> Result<LoginAttempt, StoreError>;

    /// Count of failed attempts inside the window plus the oldest qualifying
    /// timestamp, in one query.
    async fn failed_window(
        &self,
        email: &Email,
        window: Duration,
    ) -> Result<FailedWindow, StoreError>;

    async fn cleanup_old(&self, retention: Duration) -> Result<u64, StoreError>;
}

/// Links between local users and external identity-provider accounts.
#[async_trait]
pub trait OAuthAccountStore: Send + Sync {
    async fn get_by_provider(
        &self,
        provider: OAuthProvider,
        provider_user_id: &str,
    ) -> Result<Option<OAuthAccount>, StoreError>;

    async fn get_for_user(&self, user_id: Uuid) -> Result<Vec<OAuthAccount>, StoreError>;

    async fn has_provider(
        &self,
        user_id: Uuid,
        provider: OAuthProvider,
    ) -> Result<bool, StoreError>;

    /// Fails with `UniqueViolation` when the (provider, provider_user_id)
    /// pair is already linked.
    async fn create(&self, link: NewOAuthAccount) -> Result<OAuthAccount, StoreError>;

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn delete_for_user(
        &self,
        user_id: Uuid,
        provider: OAuthProvider,
    ) -> Result<bool, StoreError>;
}
