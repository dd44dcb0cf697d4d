use secrecy::Secret;
use uuid::Uuid;

use warden_core::{RefreshBearer, RefreshTokenStore};

use crate::error::AuthError;

/// Logout use case - revokes refresh tokens
///
/// With an identifiable bearer the matching ledger row alone is revoked;
/// otherwise every session the user has is. Both paths are idempotent.
pub struct LogoutUseCase<'a, R>
where
    R: RefreshTokenStore,
{
    refresh_tokens: &'a R,
}

impl<'a, R> LogoutUseCase<'a, R>
where
    R: RefreshTokenStore,
{
    pub fn new(refresh_tokens: &'a R) -> Self {
        Self { refresh_tokens }
    }

    /// Returns the number of tokens revoked.
    #[tracing::instrument(name = "LogoutUseCase::execute", skip_all)]
    pub async fn execute(
        &self,
        user_id: Uuid,
        bearer: Option<Secret<String>>,
    ) -> Result<u64, AuthError> {
        if let Some(bearer) = bearer {
            if let Some(parsed) = RefreshBearer::parse(&bearer) {
                if let Some(record) = self.refresh_tokens.get_by_id(parsed.id).await? {
                    // Only the owner may target a single session.
                    if record.user_id == user_id {
                        let revoked = self.refresh_tokens.revoke(record.id).await?;
                        tracing::info!(user_id = %user_id, "user logged out");
                        return Ok(u64::from(revoked));
                    }
                }
            }
        }

        let count = self.refresh_tokens.revoke_all_for_user(user_id).await?;
        tracing::info!(user_id = %user_id, tokens_revoked = count, "user logged out everywhere");
        Ok(count)
    }
}
