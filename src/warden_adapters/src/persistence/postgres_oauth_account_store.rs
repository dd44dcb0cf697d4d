use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use warden_core::{NewOAuthAccount, OAuthAccount, OAuthAccountStore, OAuthProvider, StoreError};

use super::{DEFAULT_CALL_TIMEOUT, with_timeout};

#[derive(Debug, sqlx::FromRow)]
struct OAuthAccountRow {
    id: Uuid,
    user_id: Uuid,
    provider: String,
    provider_user_id: String,
    email: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<OAuthAccountRow> for OAuthAccount {
    type Error = StoreError;

    fn try_from(row: OAuthAccountRow) -> Result<Self, Self::Error> {
        let provider = OAuthProvider::parse(&row.provider)
            .ok_or_else(|| StoreError::Other(format!("unknown oauth provider: {}", row.provider)))?;
        Ok(OAuthAccount {
            id: row.id,
            user_id: row.user_id,
            provider,
            provider_user_id: row.provider_user_id,
            email: row.email,
            created_at: row.created_at,
        })
    }
}

#[derive(Clone)]
pub struct PostgresOAuthAccountStore {
    pool: PgPool,
    call_timeout: Duration,
}

impl PostgresOAuthAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }
}

#[async_trait::async_trait]
impl OAuthAccountStore for PostgresOAuthAccountStore {
    async fn get_by_provider(
        &self,
        provider: OAuthProvider,
        provider_user_id: &str,
    ) -> Result<Option<OAuthAccount>, StoreError> {
        let row: Option<OAuthAccountRow> = with_timeout(
            self.call_timeout,
            sqlx::query_as(
                r"
                SELECT id, user_id, provider, provider_user_id, email, created_at
                FROM oauth_accounts
                WHERE provider = $1 AND provider_user_id = $2
                ",
            )
            .bind(provider.as_str())
            .bind(provider_user_id)
            .fetch_optional(&self.pool),
        )
        .await?;

        row.map(OAuthAccount::try_from).transpose()
    }

    async fn get_for_user(&self, user_id: Uuid) -> Result<Vec<OAuthAccount>, StoreError> {
        let rows: Vec<OAuthAccountRow> = with_timeout(
            self.call_timeout,
            sqlx::query_as(
                r"
                SELECT id, user_id, provider, provider_user_id, email, created_at
                FROM oauth_accounts
                WHERE user_id = $1
                ORDER BY created_at
                ",
            )
            .bind(user_id)
            .fetch_all(&self.pool),
        )
        .await?;

        rows.into_iter().map(OAuthAccount::try_from).collect()
    }

    async fn has_provider(
        &self,
        user_id: Uuid,
        provider: OAuthProvider,
    ) -> Result<bool, StoreError> {
        with_timeout(
            self.call_timeout,
            sqlx::query_scalar(
                r"
                SELECT EXISTS (
                    SELECT 1 FROM oauth_accounts
                    WHERE user_id = $1 AND provider = $2
                )
                ",
            )
            .bind(user_id)
            .bind(provider.as_str())
            .fetch_one(&self.pool),
        )
        .await
    }

    #[tracing::instrument(name = "Linking oauth account in PostgreSQL", skip_all)]
    async fn create(&self, link: NewOAuthAccount) -> Result<OAuthAccount, StoreError> {
        let row: OAuthAccountRow = with_timeout(
            self.call_timeout,
            sqlx::query_as(
                r"
                INSERT INTO oauth_accounts (user_id, provider, provider_user_id, email)
                VALUES ($1, $2, $3, $4)
                RETURNING id, user_id, provider, provider_user_id, email, created_at
                ",
            )
            .bind(link.user_id)
            .bind(link.provider.as_str())
            .bind(&link.provider_user_id)
            .bind(link.email.as_deref())
            .fetch_one(&self.pool),
        )
        .await?;

        let account = OAuthAccount::try_from(row)?;
        tracing::info!(user_id = %account.user_id, provider = %account.provider, "oauth account linked");
        Ok(account)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = with_timeout(
            self.call_timeout,
            sqlx::query("DELETE FROM oauth_accounts WHERE id = $1")
                .bind(id)
                .execute(&self.pool),
        )
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_for_user(
        &self,
        user_id: Uuid,
        provider: OAuthProvider,
    ) -> Result<bool, StoreError> {
        let result = with_timeout(
            self.call_timeout,
            sqlx::query("DELETE FROM oauth_accounts WHERE user_id = $1 AND provider = $2")
                .bind(user_id)
                .bind(provider.as_str())
                .execute(&self.pool),
        )
        .await?;

        Ok(result.rows_affected() >= 1)
    }
}
