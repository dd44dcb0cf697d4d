use std::time::Duration;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, Secret};
use sqlx::PgPool;
use uuid::Uuid;

use warden_core::{NewRefreshToken, RefreshTokenRecord, RefreshTokenStore, StoreError};

use super::{DEFAULT_CALL_TIMEOUT, with_timeout};

#[derive(Debug, sqlx::FromRow)]
struct RefreshTokenRow {
    id: Uuid,
    user_id: Uuid,
    token_hash: String,
    expires_at: DateTime<Utc>,
    revoked_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    user_agent: Option<String>,
    ip_address: Option<String>,
}

impl From<RefreshTokenRow> for RefreshTokenRecord {
    fn from(row: RefreshTokenRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            token_hash: Secret::from(row.token_hash),
            expires_at: row.expires_at,
            revoked_at: row.revoked_at,
            created_at: row.created_at,
            user_agent: row.user_agent,
            ip_address: row.ip_address,
        }
    }
}

#[derive(Clone)]
pub struct PostgresRefreshTokenStore {
    pool: PgPool,
    call_timeout: Duration,
}

impl PostgresRefreshTokenStore {
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
impl RefreshTokenStore for PostgresRefreshTokenStore {
    #[tracing::instrument(name = "Storing refresh token in PostgreSQL", skip_all)]
    async fn create(&self, token: NewRefreshToken) -> Result<RefreshTokenRecord, StoreError> {
        let row: RefreshTokenRow = with_timeout(
            self.call_timeout,
            sqlx::query_as(
                r"
                INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at, user_agent, ip_address)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id, user_id, token_hash, expires_at, revoked_at,
                          created_at, user_agent, ip_address
                ",
            )
            .bind(token.id)
            .bind(token.user_id)
            .bind(token.token_hash.expose_secret())
            .bind(token.expires_at)
            .bind(token.user_agent)
            .bind(token.ip_address)
            .fetch_one(&self.pool),
        )
        .await?;

        tracing::debug!(user_id = %row.user_id, "refresh token stored");
        Ok(row.into())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<RefreshTokenRecord>, StoreError> {
        let row: Option<RefreshTokenRow> = with_timeout(
            self.call_timeout,
            sqlx::query_as(
                r"
                SELECT id, user_id, token_hash, expires_at, revoked_at,
                       created_at, user_agent, ip_address
                FROM refresh_tokens
                WHERE id = $1
                ",
            )
            .bind(id)
            .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.map(Into::into))
    }

    #[tracing::instrument(name = "Revoking refresh token in PostgreSQL", skip_all)]
    async fn revoke(&self, id: Uuid) -> Result<bool, StoreError> {
        // The revoked_at guard makes this a compare-and-swap: of any number
        // of concurrent callers, exactly one sees rows_affected == 1.
        let result = with_timeout(
            self.call_timeout,
            sqlx::query(
                r"
                UPDATE refresh_tokens
                SET revoked_at = NOW()
                WHERE id = $1 AND revoked_at IS NULL
                ",
            )
            .bind(id)
            .execute(&self.pool),
        )
        .await?;

        Ok(result.rows_affected() == 1)
    }

    #[tracing::instrument(name = "Revoking all refresh tokens for user", skip_all)]
    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let result = with_timeout(
            self.call_timeout,
            sqlx::query(
                r"
                UPDATE refresh_tokens
                SET revoked_at = NOW()
                WHERE user_id = $1 AND revoked_at IS NULL
                ",
            )
            .bind(user_id)
            .execute(&self.pool),
        )
        .await?;

        let count = result.rows_affected();
        if count > 0 {
            tracing::info!(user_id = %user_id, count, "refresh tokens revoked");
        }
        Ok(count)
    }

    async fn get_valid_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<RefreshTokenRecord>, StoreError> {
        let rows: Vec<RefreshTokenRow> = with_timeout(
            self.call_timeout,
            sqlx::query_as(
                r"
                SELECT id, user_id, token_hash, expires_at, revoked_at,
                       created_at, user_agent, ip_address
                FROM refresh_tokens
                WHERE user_id = $1
                  AND revoked_at IS NULL
                  AND expires_at > NOW()
                ORDER BY created_at DESC
                ",
            )
            .bind(user_id)
            .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn cleanup_expired(&self, retention: chrono::Duration) -> Result<u64, StoreError> {
        let cutoff = Utc::now() - retention;
        let result = with_timeout(
            self.call_timeout,
            sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < $1")
                .bind(cutoff)
                .execute(&self.pool),
        )
        .await?;

        let count = result.rows_affected();
        if count > 0 {
            tracing::info!(count, "expired refresh tokens purged");
        }
        Ok(count)
    }
}
