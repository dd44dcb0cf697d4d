use secrecy::ExposeSecret;
use uuid::Uuid;

use warden_core::{
    ClientMeta, CredentialHasher, Email, NewOAuthAccount, NewUser, OAuthAccountStore,
    OAuthProvider, RefreshTokenStore, StoreError, TokenIssuer, UserStore,
};

use crate::{
    error::AuthError,
    session::{AuthSession, SessionMinter},
};

/// OAuth-authenticate use case - resolves an external identity to a local
/// user and issues a session
///
/// Resolution order: an existing (provider, provider_user_id) link wins
/// regardless of the email or name the provider sends today; otherwise a
/// user with the same email gets the link; otherwise a fresh passwordless,
/// email-verified account is created.
pub struct OAuthAuthenticateUseCase<'a, O, U, R, H, T>
where
    O: OAuthAccountStore,
    U: UserStore,
    R: RefreshTokenStore,
    H: CredentialHasher,
    T: TokenIssuer,
{
    oauth_accounts: &'a O,
    users: &'a U,
    refresh_tokens: &'a R,
    hasher: &'a H,
    issuer: &'a T,
    refresh_ttl: chrono::Duration,
}

impl<'a, O, U, R, H, T> OAuthAuthenticateUseCase<'a, O, U, R, H, T>
where
    O: OAuthAccountStore,
    U: UserStore,
    R: RefreshTokenStore,
    H: CredentialHasher,
    T: TokenIssuer,
{
    pub fn new(
        oauth_accounts: &'a O,
        users: &'a U,
        refresh_tokens: &'a R,
        hasher: &'a H,
        issuer: &'a T,
        refresh_ttl: chrono::Duration,
    ) -> Self {
        Self {
            oauth_accounts,
            users,
            refresh_tokens,
            hasher,
            issuer,
            refresh_ttl,
        }
    }

    #[tracing::instrument(name = "OAuthAuthenticateUseCase::execute", skip_all, fields(%provider))]
    pub async fn execute(
        &self,
        provider: OAuthProvider,
        provider_user_id: String,
        email: Email,
        name: String,
        meta: &ClientMeta,
    ) -> Result<AuthSession, AuthError> {
        let user = match self
            .oauth_accounts
            .get_by_provider(provider, &provider_user_id)
            .await?
        {
            Some(link) => self.users.get_by_id(link.user_id).await?.ok_or_else(|| {
                tracing::error!(oauth_account_id = %link.id, "oauth link references a missing user");
                AuthError::Internal("linked account references a missing user".to_string())
            })?,
            None => match self.users.get_by_email(&email).await? {
                Some(user) => {
                    self.link(user.id, provider, &provider_user_id, &email)
                        .await?;
                    tracing::info!(user_id = %user.id, "oauth account linked to existing user");
                    user
                }
                None => {
                    // The provider asserts the address, so the account
                    // starts out verified and passwordless.
                    let user = self
                        .users
                        .create(NewUser {
                            email: email.clone(),
                            name,
                            password_hash: None,
                            email_verified: true,
                        })
                        .await?;
                    self.link(user.id, provider, &provider_user_id, &email)
                        .await?;
                    tracing::info!(user_id = %user.id, "user created from oauth login");
                    user
                }
            },
        };

        SessionMinter::new(
            self.refresh_tokens,
            self.hasher,
            self.issuer,
            self.refresh_ttl,
        )
        .mint(&user, meta)
        .await
    }

    async fn link(
        &self,
        user_id: Uuid,
        provider: OAuthProvider,
        provider_user_id: &str,
        email: &Email,
    ) -> Result<(), AuthError> {
        match self
            .oauth_accounts
            .create(NewOAuthAccount {
                user_id,
                provider,
                provider_user_id: provider_user_id.to_string(),
                email: Some(email.as_ref().expose_secret().clone()),
            })
            .await
        {
            Ok(_) => Ok(()),
            Err(StoreError::UniqueViolation(_)) => Err(AuthError::Conflict(format!(
                "this {provider} account is already linked to another user"
            ))),
            Err(e) => Err(e.into()),
        }
    }
}
