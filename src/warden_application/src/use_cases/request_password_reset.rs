use chrono::{Duration, Utc};
use secrecy::ExposeSecret;
use uuid::Uuid;

use warden_core::{
    CredentialHasher, Email, EmailClient, NewPasswordResetToken, PasswordResetStore, UserStore,
    generate_secure_token,
};

use crate::error::AuthError;

/// Request-password-reset use case
///
/// Reports success whether or not the email maps to an account, so the
/// endpoint cannot be used to probe for registered addresses. The reset
/// secret leaves only through the email channel, never in the return value.
pub struct RequestPasswordResetUseCase<'a, U, P, H, E>
where
    U: UserStore,
    P: PasswordResetStore,
    H: CredentialHasher,
    E: EmailClient,
{
    users: &'a U,
    password_resets: &'a P,
    hasher: &'a H,
    email_client: &'a E,
    reset_ttl: Duration,
}

impl<'a, U, P, H, E> RequestPasswordResetUseCase<'a, U, P, H, E>
where
    U: UserStore,
    P: PasswordResetStore,
    H: CredentialHasher,
    E: EmailClient,
{
    pub fn new(
        users: &'a U,
        password_resets: &'a P,
        hasher: &'a H,
        email_client: &'a E,
        reset_ttl: Duration,
    ) -> Self {
        Self {
            users,
            password_resets,
            hasher,
            email_client,
            reset_ttl,
        }
    }

    #[tracing::instrument(name = "RequestPasswordResetUseCase::execute", skip_all)]
    pub async fn execute(&self, email: Email) -> Result<(), AuthError> {
        let Some(user) = self.users.get_by_email(&email).await? else {
            tracing::info!(email = %email.masked(), "password reset requested for unknown email");
            return Ok(());
        };

        let secret = generate_secure_token()?;
        let token_hash = self.hasher.hash(&secret).await?;

        // issue() retires any outstanding tokens in the same transaction,
        // so at most one reset link is live per user.
        self.password_resets
            .issue(NewPasswordResetToken {
                id: Uuid::new_v4(),
                user_id: user.id,
                token_hash,
                expires_at: Utc::now() + self.reset_ttl,
            })
            .await?;

        let minutes = self.reset_ttl.num_minutes().max(1);
        let content = format!(
            "Use the code below to reset your password. It expires in {minutes} minutes.\n\n{}",
            secret.expose_secret()
        );
        self.email_client
            .send_email(&email, "Reset your password", &content)
            .await
            .map_err(|e| {
                tracing::error!(user_id = %user.id, error = %e, "failed to deliver password reset email");
                AuthError::ServiceUnavailable("could not deliver the password reset email".to_string())
            })?;

        tracing::info!(user_id = %user.id, "password reset token issued");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use warden_adapters::email::MockEmailClient;
    use warden_adapters::persistence::{HashMapPasswordResetStore, HashMapUserStore};
    use warden_core::NewUser;

    use super::*;
    use crate::test_support::{FailingEmailClient, FakeHasher, email};

    async fn seed_user(users: &HashMapUserStore) -> Uuid {
        users
            .create(NewUser {
                email: email("a@x.com"),
                name: "Ann".to_string(),
                password_hash: None,
                email_verified: true,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_unknown_email_reports_success_and_sends_nothing() {
        let users = HashMapUserStore::new();
        let resets = HashMapPasswordResetStore::new();
        let hasher = FakeHasher;
        let mailer = MockEmailClient::new();

        RequestPasswordResetUseCase::new(&users, &resets, &hasher, &mailer, Duration::hours(1))
            .execute(email("ghost@x.com"))
            .await
            .unwrap();

        assert!(mailer.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_reset_email_carries_the_secret_not_its_hash() {
        let users = HashMapUserStore::new();
        let resets = HashMapPasswordResetStore::new();
        let hasher = FakeHasher;
        let mailer = MockEmailClient::new();
        let user_id = seed_user(&users).await;

        RequestPasswordResetUseCase::new(&users, &resets, &hasher, &mailer, Duration::hours(1))
            .execute(email("a@x.com"))
            .await
            .unwrap();

        let sent = mailer.sent().await;
        assert_eq!(sent.len(), 1);
        let delivered_secret = sent[0].content.lines().last().unwrap().to_string();
        assert_eq!(delivered_secret.len(), warden_core::SECURE_TOKEN_LEN);

        let record = resets.get_valid_for_user(user_id).await.unwrap().unwrap();
        assert_ne!(record.token_hash.expose_secret(), &delivered_secret);
    }

    #[tokio::test]
    async fn test_new_request_invalidates_the_previous_token() {
        let users = HashMapUserStore::new();
        let resets = HashMapPasswordResetStore::new();
        let hasher = FakeHasher;
        let mailer = MockEmailClient::new();
        let user_id = seed_user(&users).await;

        let use_case = RequestPasswordResetUseCase::new(
            &users,
            &resets,
            &hasher,
            &mailer,
            Duration::hours(1),
        );
        use_case.execute(email("a@x.com")).await.unwrap();
        let first = resets.get_valid_for_user(user_id).await.unwrap().unwrap();

        use_case.execute(email("a@x.com")).await.unwrap();
        let second = resets.get_valid_for_user(user_id).await.unwrap().unwrap();

        assert_ne!(first.id, second.id);
        // Only the latest token is still consumable.
        assert!(!resets.mark_used(first.id).await.unwrap());
        assert!(resets.mark_used(second.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delivery_failure_surfaces_as_service_unavailable() {
        let users = HashMapUserStore::new();
        let resets = HashMapPasswordResetStore::new();
        let hasher = FakeHasher;
        let mailer = FailingEmailClient;
        seed_user(&users).await;

        let result = RequestPasswordResetUseCase::new(
            &users,
            &resets,
            &hasher,
            &mailer,
            Duration::hours(1),
        )
        .execute(email("a@x.com"))
        .await;

        assert!(matches!(result, Err(AuthError::ServiceUnavailable(_))));
    }
}
