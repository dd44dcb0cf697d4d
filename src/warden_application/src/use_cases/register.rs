use secrecy::Secret;

use warden_core::{
    AuthPolicy, ClientMeta, CredentialHasher, Email, NewUser, Password, RefreshTokenStore,
    StoreError, TokenIssuer, UserStore,
};

use crate::{
    error::AuthError,
    session::{AuthSession, SessionMinter},
};

const EMAIL_TAKEN: &str = "an account with this email already exists";

/// Register use case - creates an account and issues the first session
pub struct RegisterUseCase<'a, U, R, H, T>
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
    policy: &'a AuthPolicy,
}

impl<'a, U, R, H, T> RegisterUseCase<'a, U, R, H, T>
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
        policy: &'a AuthPolicy,
    ) -> Self {
        Self {
            users,
            refresh_tokens,
            hasher,
            issuer,
            policy,
        }
    }

    /// Execute the register use case
    ///
    /// # Returns
    /// AuthSession with tokens on success; Validation for a weak password,
    /// Conflict when the email is taken
    #[tracing::instrument(name = "RegisterUseCase::execute", skip_all)]
    pub async fn execute(
        &self,
        email: Email,
        password: Secret<String>,
        name: String,
        meta: &ClientMeta,
    ) -> Result<AuthSession, AuthError> {
        let password = Password::parse(password, &self.policy.password)
            .map_err(|e| AuthError::Validation(e.to_string()))?;

        if self.users.email_exists(&email).await? {
            return Err(AuthError::Conflict(EMAIL_TAKEN.to_string()));
        }

        let password_hash = self.hasher.hash(password.as_ref()).await?;
        let user = match self
            .users
            .create(NewUser {
                email,
                name,
                password_hash: Some(password_hash),
                email_verified: false,
            })
            .await
        {
            Ok(user) => user,
            // Lost the race between the existence check and the insert.
            Err(StoreError::UniqueViolation(_)) => {
                return Err(AuthError::Conflict(EMAIL_TAKEN.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let session = SessionMinter::new(
            self.refresh_tokens,
            self.hasher,
            self.issuer,
            self.policy.refresh_token_ttl,
        )
        .mint(&user, meta)
        .await?;

        tracing::info!(user_id = %user.id, "user registered");

        Ok(session)
    }
}
