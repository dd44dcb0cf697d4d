use secrecy::Secret;

use warden_core::{
    ClientMeta, CredentialHasher, Email, LoginAttemptStore, RefreshTokenStore, TokenIssuer,
    UserStore,
};

use crate::{
    error::AuthError,
    lockout::LoginTracker,
    session::{AuthSession, SessionMinter},
};

/// Login use case - password authentication behind the lockout gate
///
/// The lockout check runs before any credential comparison, and a missing
/// account and a wrong password produce byte-identical failures.
pub struct LoginUseCase<'a, U, L, R, H, T>
where
    U: UserStore,
    L: LoginAttemptStore,
    R: RefreshTokenStore,
    H: CredentialHasher,
    T: TokenIssuer,
{
    users: &'a U,
    tracker: &'a LoginTracker<L>,
    refresh_tokens: &'a R,
    hasher: &'a H,
    issuer: &'a T,
    refresh_ttl: chrono::Duration,
}

impl<'a, U, L, R, H, T> LoginUseCase<'a, U, L, R, H, T>
where
    U: UserStore,
    L: LoginAttemptStore,
    R: RefreshTokenStore,
    H: CredentialHasher,
    T: TokenIssuer,
{
    pub fn new(
        users: &'a U,
        tracker: &'a LoginTracker<L>,
        refresh_tokens: &'a R,
        hasher: &'a H,
        issuer: &'a T,
        refresh_ttl: chrono::Duration,
    ) -> Self {
        Self {
            users,
            tracker,
            refresh_tokens,
            hasher,
            issuer,
            refresh_ttl,
        }
    }

    #[tracing::instrument(name = "LoginUseCase::execute", skip_all)]
    pub async fn execute(
        &self,
        email: Email,
        password: Secret<String>,
        meta: &ClientMeta,
    ) -> Result<AuthSession, AuthError> {
        if let Some(retry_after_secs) = self.tracker.lockout_remaining(&email).await? {
            tracing::warn!(email = %email.masked(), "login attempt while locked out");
            return Err(AuthError::RateLimit { retry_after_secs });
        }

        let user = self.users.get_by_email(&email).await?;

        // Accounts without a password hash (OAuth-only) never match; there
        // is nothing to compare against.
        let password_ok = match user.as_ref().and_then(|u| u.password_hash.as_ref()) {
            Some(hash) => self.hasher.verify(&password, hash).await?,
            None => false,
        };

        let Some(user) = user.filter(|_| password_ok) else {
            self.tracker.record_attempt(&email, false, meta).await?;
            return Err(AuthError::invalid_credentials());
        };

        self.tracker.record_attempt(&email, true, meta).await?;

        let session = SessionMinter::new(
            self.refresh_tokens,
            self.hasher,
            self.issuer,
            self.refresh_ttl,
        )
        .mint(&user, meta)
        .await?;

        tracing::info!(user_id = %user.id, "user logged in");

        Ok(session)
    }
}
