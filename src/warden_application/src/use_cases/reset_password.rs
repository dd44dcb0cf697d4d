use secrecy::Secret;

use warden_core::{
    AuthPolicy, CredentialHasher, Email, Password, PasswordResetStore, RefreshTokenStore,
    UserStore,
};

use crate::error::AuthError;

/// One reason for every failure mode short of a weak password, so the reset
/// endpoint leaks nothing about which part was wrong.
const INVALID_RESET_TOKEN: &str = "invalid or expired reset token";

/// Reset-password use case - consumes a reset token and rotates credentials
///
/// On success every refresh token the user holds is revoked and no new
/// tokens are issued: the user proves the new password by logging in.
pub struct ResetPasswordUseCase<'a, U, P, R, H>
where
    U: UserStore,
    P: PasswordResetStore,
    R: RefreshTokenStore,
    H: CredentialHasher,
{
    users: &'a U,
    password_resets: &'a P,
    refresh_tokens: &'a R,
    hasher: &'a H,
    policy: &'a AuthPolicy,
}

impl<'a, U, P, R, H> ResetPasswordUseCase<'a, U, P, R, H>
where
    U: UserStore,
    P: PasswordResetStore,
    R: RefreshTokenStore,
    H: CredentialHasher,
{
    pub fn new(
        users: &'a U,
        password_resets: &'a P,
        refresh_tokens: &'a R,
        hasher: &'a H,
        policy: &'a AuthPolicy,
    ) -> Self {
        Self {
            users,
            password_resets,
            refresh_tokens,
            hasher,
            policy,
        }
    }

    #[tracing::instrument(name = "ResetPasswordUseCase::execute", skip_all)]
    pub async fn execute(
        &self,
        email: Email,
        token: Secret<String>,
        new_password: Secret<String>,
    ) -> Result<(), AuthError> {
        let new_password = Password::parse(new_password, &self.policy.password)
            .map_err(|e| AuthError::Validation(e.to_string()))?;

        let invalid = || AuthError::Authentication(INVALID_RESET_TOKEN.to_string());

        let Some(user) = self.users.get_by_email(&email).await? else {
            return Err(invalid());
        };
        let Some(record) = self.password_resets.get_valid_for_user(user.id).await? else {
            return Err(invalid());
        };
        if !self.hasher.verify(&token, &record.token_hash).await? {
            return Err(invalid());
        }

        // Compare-and-swap: concurrent resets race for the token and only
        // one consumes it.
        if !self.password_resets.mark_used(record.id).await? {
            return Err(invalid());
        }

        let password_hash = self.hasher.hash(new_password.as_ref()).await?;
        if !self.users.update_password(user.id, password_hash).await? {
            return Err(AuthError::Internal(
                "user vanished during password reset".to_string(),
            ));
        }

        let revoked = self.refresh_tokens.revoke_all_for_user(user.id).await?;
        tracing::info!(user_id = %user.id, sessions_revoked = revoked, "password reset completed");

        Ok(())
    }
}
