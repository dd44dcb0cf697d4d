use chrono::{Duration, Utc};
use secrecy::{ExposeSecret, Secret};
use uuid::Uuid;

use warden_core::{
    AccessTokenRequest, ClientMeta, CredentialHasher, NewRefreshToken, RefreshBearer,
    RefreshTokenStore, TokenIssuer, User, generate_secure_token,
};

use crate::error::AuthError;

/// What a successful authentication hands back to the routing layer.
///
/// The refresh token is the only copy of the bearer secret that will ever
/// exist; the ledger keeps just its hash.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub access_token: Secret<String>,
    pub refresh_token: Secret<String>,
}

/// Mints the access/refresh pair for a user. Shared by the register, login,
/// refresh, and OAuth flows.
pub(crate) struct SessionMinter<'a, R, H, T> {
    refresh_tokens: &'a R,
    hasher: &'a H,
    issuer: &'a T,
    refresh_ttl: Duration,
}

impl<'a, R, H, T> SessionMinter<'a, R, H, T>
where
    R: RefreshTokenStore,
    H: CredentialHasher,
    T: TokenIssuer,
{
    pub(crate) fn new(
        refresh_tokens: &'a R,
        hasher: &'a H,
        issuer: &'a T,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            refresh_tokens,
            hasher,
            issuer,
            refresh_ttl,
        }
    }

    #[tracing::instrument(name = "SessionMinter::mint", skip_all)]
    pub(crate) async fn mint(
        &self,
        user: &User,
        meta: &ClientMeta,
    ) -> Result<AuthSession, AuthError> {
        let access_token = self.issuer.create_access_token(&AccessTokenRequest {
            user_id: user.id,
            email: user.email.as_ref().expose_secret().clone(),
            name: user.name.clone(),
            org_id: None,
            org_role: None,
            ttl: None,
        })?;

        // The record id is generated here, not by the store, so it can be
        // embedded in the bearer as the lookup half.
        let secret = generate_secure_token()?;
        let token_hash = self.hasher.hash(&secret).await?;
        let id = Uuid::new_v4();

        self.refresh_tokens
            .create(NewRefreshToken {
                id,
                user_id: user.id,
                token_hash,
                expires_at: Utc::now() + self.refresh_ttl,
                user_agent: meta.user_agent.clone(),
                ip_address: meta.ip_address.clone(),
            })
            .await?;

        Ok(AuthSession {
            user: user.clone(),
            access_token: Secret::from(access_token),
            refresh_token: RefreshBearer::compose(id, &secret),
        })
    }
}
