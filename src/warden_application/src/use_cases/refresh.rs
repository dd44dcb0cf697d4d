use chrono::Utc;
use secrecy::Secret;

use warden_core::{
    ClientMeta, CredentialHasher, RefreshBearer, RefreshTokenStore, TokenIssuer, UserStore,
};

use crate::{
    error::AuthError,
    session::{AuthSession, SessionMinter},
};

const INVALID_REFRESH: &str = "invalid or expired refresh token";

/// Refresh use case - exchanges a refresh bearer for a fresh token pair
///
/// The bearer is `id.secret`: the id half locates the ledger row in one
/// read, the secret half is verified against the stored hash. The old row
/// is retired on every successful exchange (rotation).
pub struct RefreshUseCase<'a, U, R, H, T>
where
    U: UserStore,
    R: RefreshTokenStore,
    H: CredentialHasher,
    T: TokenIssuer,
{
    users: &'a U,
    refresh_tokens: &'a R,
    hasher: &'a H,
    issuer: &'a T,
    refresh_ttl: chrono::Duration,
}

impl<'a, U, R, H, T> RefreshUseCase<'a, U, R, H, T>
where
    U: UserStore,
    R: RefreshTokenStore,
    H: CredentialHasher,
    T: TokenIssuer,
{
    pub fn new(
        users: &'a U,
        refresh_tokens: &'a R,
        hasher: &'a H,
        issuer: &'a T,
        refresh_ttl: chrono::Duration,
    ) -> Self {
        Self {
            users,
            refresh_tokens,
            hasher,
            issuer,
            refresh_ttl,
        }
    }

    #[tracing::instrument(name = "RefreshUseCase::execute", skip_all)]
    pub async fn execute(
        &self,
        bearer: Secret<String>,
        meta: &ClientMeta,
    ) -> Result<AuthSession, AuthError> {
        let invalid = || AuthError::Authentication(INVALID_REFRESH.to_string());

        let Some(parsed) = RefreshBearer::parse(&bearer) else {
            return Err(invalid());
        };
        let Some(record) = self.refresh_tokens.get_by_id(parsed.id).await? else {
            return Err(invalid());
        };

        if record.revoked_at.is_some() {
            tracing::warn!(user_id = %record.user_id, "presented refresh token was already revoked");
            return Err(invalid());
        }
        if record.expires_at <= Utc::now() {
            return Err(invalid());
        }
        if !self.hasher.verify(&parsed.secret, &record.token_hash).await? {
            return Err(invalid());
        }

        let Some(user) = self.users.get_by_id(record.user_id).await? else {
            return Err(invalid());
        };

        // Compare-and-swap: exactly one of any concurrent exchanges may
        // retire the old token; the rest are replays.
        if !self.refresh_tokens.revoke(record.id).await? {
            tracing::warn!(user_id = %record.user_id, "refresh token lost a rotation race");
            return Err(invalid());
        }

        let session = SessionMinter::new(
            self.refresh_tokens,
            self.hasher,
            self.issuer,
            self.refresh_ttl,
        )
        .mint(&user, meta)
        .await?;

        tracing::debug!(user_id = %user.id, "refresh token rotated");

        Ok(session)
    }
}
