use chrono::Duration;
use secrecy::Secret;
use uuid::Uuid;

use warden_core::{
    AuthPolicy, ClientMeta, CredentialHasher, Email, EmailClient, LoginAttemptStore, OAuthAccount,
    OAuthAccountStore, OAuthProvider, PasswordResetStore, RefreshTokenRecord, RefreshTokenStore,
    TokenIssuer, User, UserStore,
};

use crate::{
    error::AuthError,
    lockout::LoginTracker,
    session::AuthSession,
    use_cases::{
        LoginUseCase, LogoutUseCase, OAuthAuthenticateUseCase, RefreshUseCase, RegisterUseCase,
        RequestPasswordResetUseCase, ResetPasswordUseCase,
    },
};

/// Row counts from a housekeeping sweep.
#[derive(Debug, Clone, Copy, Default)]
pub struct CleanupReport {
    pub refresh_tokens_deleted: u64,
    pub reset_tokens_deleted: u64,
    pub login_attempts_deleted: u64,
}

/// The auth orchestrator: the only type the routing layer talks to.
///
/// Every collaborator is handed in through `new` - stores, hasher, token
/// issuer, email client, policy - so there is no global state and tests can
/// build as many isolated instances as they like. Raw inputs (emails,
/// passwords, bearers) are parsed at this boundary; the use cases underneath
/// work on domain types only.
pub struct AuthService<U, R, P, L, O, H, T, E> {
    users: U,
    refresh_tokens: R,
    password_resets: P,
    oauth_accounts: O,
    login_tracker: LoginTracker<L>,
    hasher: H,
    token_issuer: T,
    email_client: E,
    policy: AuthPolicy,
}

impl<U, R, P, L, O, H, T, E> AuthService<U, R, P, L, O, H, T, E>
where
    U: UserStore,
    R: RefreshTokenStore,
    P: PasswordResetStore,
    L: LoginAttemptStore,
    O: OAuthAccountStore,
    H: CredentialHasher,
    T: TokenIssuer,
    E: EmailClient,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        users: U,
        refresh_tokens: R,
        password_resets: P,
        login_attempts: L,
        oauth_accounts: O,
        hasher: H,
        token_issuer: T,
        email_client: E,
        policy: AuthPolicy,
    ) -> Self {
        Self {
            users,
            refresh_tokens,
            password_resets,
            oauth_accounts,
            login_tracker: LoginTracker::new(login_attempts, policy.lockout),
            hasher,
            token_issuer,
            email_client,
            policy,
        }
    }

    pub fn policy(&self) -> &AuthPolicy {
        &self.policy
    }

    pub fn login_tracker(&self) -> &LoginTracker<L> {
        &self.login_tracker
    }

    pub async fn register(
        &self,
        email: Secret<String>,
        password: Secret<String>,
        name: String,
        meta: ClientMeta,
    ) -> Result<AuthSession, AuthError> {
        let email = Email::parse(email).map_err(|e| AuthError::Validation(e.to_string()))?;
        RegisterUseCase::new(
            &self.users,
            &self.refresh_tokens,
            &self.hasher,
            &self.token_issuer,
            &self.policy,
        )
        .execute(email, password, name, &meta)
        .await
    }

    pub async fn login(
        &self,
        email: Secret<String>,
        password: Secret<String>,
        meta: ClientMeta,
    ) -> Result<AuthSession, AuthError> {
        // A syntactically invalid email cannot match an account; answer
        // exactly as if the credentials were wrong.
        let Ok(email) = Email::parse(email) else {
            return Err(AuthError::invalid_credentials());
        };
        LoginUseCase::new(
            &self.users,
            &self.login_tracker,
            &self.refresh_tokens,
            &self.hasher,
            &self.token_issuer,
            self.policy.refresh_token_ttl,
        )
        .execute(email, password, &meta)
        .await
    }

    pub async fn refresh(
        &self,
        refresh_token: Secret<String>,
        meta: ClientMeta,
    ) -> Result<AuthSession, AuthError> {
        RefreshUseCase::new(
            &self.users,
            &self.refresh_tokens,
            &self.hasher,
            &self.token_issuer,
            self.policy.refresh_token_ttl,
        )
        .execute(refresh_token, &meta)
        .await
    }

    /// Revoke the presented session, or every session when the bearer is
    /// absent or unrecognizable. Returns the number of tokens revoked.
    pub async fn logout(
        &self,
        user_id: Uuid,
        refresh_token: Option<Secret<String>>,
    ) -> Result<u64, AuthError> {
        LogoutUseCase::new(&self.refresh_tokens)
            .execute(user_id, refresh_token)
            .await
    }

    /// Always succeeds from the caller's point of view; whether the email
    /// mapped to an account is not observable.
    pub async fn request_password_reset(&self, email: Secret<String>) -> Result<(), AuthError> {
        let Ok(email) = Email::parse(email) else {
            return Ok(());
        };
        RequestPasswordResetUseCase::new(
            &self.users,
            &self.password_resets,
            &self.hasher,
            &self.email_client,
            self.policy.reset_token_ttl,
        )
        .execute(email)
        .await
    }

    pub async fn reset_password(
        &self,
        email: Secret<String>,
        token: Secret<String>,
        new_password: Secret<String>,
    ) -> Result<(), AuthError> {
        let use_case = ResetPasswordUseCase::new(
            &self.users,
            &self.password_resets,
            &self.refresh_tokens,
            &self.hasher,
            &self.policy,
        );
        let Ok(email) = Email::parse(email) else {
            return Err(AuthError::Authentication(
                "invalid or expired reset token".to_string(),
            ));
        };
        use_case.execute(email, token, new_password).await
    }

    pub async fn oauth_authenticate(
        &self,
        provider: OAuthProvider,
        provider_user_id: String,
        email: Secret<String>,
        name: String,
        meta: ClientMeta,
    ) -> Result<AuthSession, AuthError> {
        let email = Email::parse(email).map_err(|e| AuthError::Validation(e.to_string()))?;
        OAuthAuthenticateUseCase::new(
            &self.oauth_accounts,
            &self.users,
            &self.refresh_tokens,
            &self.hasher,
            &self.token_issuer,
            self.policy.refresh_token_ttl,
        )
        .execute(provider, provider_user_id, email, name, &meta)
        .await
    }

    /// Resolve a bearer access token to its live user. The token's own
    /// validity (signature, expiry, claims) is checked first.
    pub async fn current_user(&self, access_token: &str) -> Result<User, AuthError> {
        let claims = self.token_issuer.decode_access_token(access_token)?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AuthError::Authentication("invalid token subject".to_string()))?;
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::Authentication("user no longer exists".to_string()))
    }

    pub async fn valid_sessions(&self, user_id: Uuid) -> Result<Vec<RefreshTokenRecord>, AuthError> {
        Ok(self.refresh_tokens.get_valid_for_user(user_id).await?)
    }

    pub async fn verify_email(&self, user_id: Uuid) -> Result<bool, AuthError> {
        Ok(self.users.verify_email(user_id).await?)
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        name: Option<String>,
        avatar_url: Option<String>,
    ) -> Result<Option<User>, AuthError> {
        Ok(self.users.update_profile(user_id, name, avatar_url).await?)
    }

    /// Soft-delete the account and revoke every session it holds.
    pub async fn deactivate_user(&self, user_id: Uuid) -> Result<bool, AuthError> {
        let deleted = self.users.soft_delete(user_id).await?;
        if deleted {
            let revoked = self.refresh_tokens.revoke_all_for_user(user_id).await?;
            tracing::info!(user_id = %user_id, sessions_revoked = revoked, "user deactivated");
        }
        Ok(deleted)
    }

    pub async fn linked_accounts(&self, user_id: Uuid) -> Result<Vec<OAuthAccount>, AuthError> {
        Ok(self.oauth_accounts.get_for_user(user_id).await?)
    }

    pub async fn has_oauth_provider(
        &self,
        user_id: Uuid,
        provider: OAuthProvider,
    ) -> Result<bool, AuthError> {
        Ok(self.oauth_accounts.has_provider(user_id, provider).await?)
    }

    pub async fn unlink_oauth_provider(
        &self,
        user_id: Uuid,
        provider: OAuthProvider,
    ) -> Result<bool, AuthError> {
        let unlinked = self
            .oauth_accounts
            .delete_for_user(user_id, provider)
            .await?;
        if unlinked {
            tracing::info!(user_id = %user_id, %provider, "oauth account unlinked");
        }
        Ok(unlinked)
    }

    /// Purge rows that have been in a terminal state longer than
    /// `retention`. Only deletes expired or stale data, so it is safe to run
    /// while live traffic continues.
    pub async fn cleanup_expired(&self, retention: Duration) -> Result<CleanupReport, AuthError> {
        let report = CleanupReport {
            refresh_tokens_deleted: self.refresh_tokens.cleanup_expired(retention).await?,
            reset_tokens_deleted: self.password_resets.cleanup_expired(retention).await?,
            login_attempts_deleted: self.login_tracker.cleanup_old(retention).await?,
        };
        tracing::info!(
            refresh_tokens = report.refresh_tokens_deleted,
            reset_tokens = report.reset_tokens_deleted,
            login_attempts = report.login_attempts_deleted,
            "expired auth rows purged"
        );
        Ok(report)
    }
}
