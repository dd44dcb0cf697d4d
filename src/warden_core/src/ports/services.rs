use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use secrecy::Secret;
use thiserror::Error;

use crate::domain::{
    email::Email,
    token::{AccessTokenClaims, AccessTokenRequest, TokenError},
};

#[derive(Debug, Error)]
pub enum HasherError {
    #[error("hashing failed: {0}")]
    Hash(String),
    #[error("hash verification failed: {0}")]
    Verify(String),
}

/// One-way hashing of passwords and token secrets.
///
/// Implementations are deliberately CPU-expensive and must run the work off
/// the async executor (the Argon2 adapter uses `spawn_blocking`). A wrong
/// candidate is `Ok(false)`, not an error; errors mean the hash itself could
/// not be processed.
#[async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash(&self, secret: &Secret<String>) -> Result<Secret<String>, HasherError>;

    async fn verify(
        &self,
        candidate: &Secret<String>,
        hash: &Secret<String>,
    ) -> Result<bool, HasherError>;
}

/// Stateless creation and verification of signed access tokens.
///
/// Access tokens are never persisted; revocation works by keeping the TTL
/// short and revoking the refresh token that would mint the next one.
pub trait TokenIssuer: Send + Sync {
    fn create_access_token(&self, request: &AccessTokenRequest) -> Result<String, TokenError>;

    /// Verify signature and expiry and return the claims. Fails with a
    /// reason-specific `TokenError`; a token expired by one second is
    /// already expired.
    fn decode_access_token(&self, token: &str) -> Result<AccessTokenClaims, TokenError>;

    /// Whether the token is expired, or will be within `margin`. Used by
    /// clients to refresh proactively; does not verify the signature.
    fn is_token_expired(&self, token: &str, margin: Duration) -> bool;

    /// Best-effort subject extraction for logging and correlation. Does not
    /// verify the signature; `None` on any decode problem.
    fn token_user_id(&self, token: &str) -> Option<String>;

    /// Best-effort expiry extraction. Does not verify the signature.
    fn token_expiry(&self, token: &str) -> Option<DateTime<Utc>>;
}

/// Outbound email delivery, an external collaborator of the auth core.
#[async_trait]
pub trait EmailClient: Send + Sync {
    async fn send_email(
        &self,
        recipient: &Email,
        subject: &str,
        content: &str,
    ) -> Result<(), String>;
}
