use std::time::Duration;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, Secret};
use sqlx::PgPool;
use uuid::Uuid;

use warden_core::{NewPasswordResetToken, PasswordResetStore, PasswordResetTokenRecord, StoreError};

use super::{DEFAULT_CALL_TIMEOUT, with_timeout};

#[derive(Debug, sqlx::FromRow)]
struct ResetTokenRow {
    id: Uuid,
    user_id: Uuid,
    token_hash: String,
    expires_at: DateTime<Utc>,
    used_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<ResetTokenRow> for PasswordResetTokenRecord {
    fn from(row: ResetTokenRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            token_hash: Secret::from(row.token_hash),
            expires_at: row.expires_at,
            used_at: row.used_at,
            created_at: row.created_at,
        }
    }
}

#[derive(Clone)]
pub struct PostgresPasswordResetStore {
    pool: PgPool,
    call_timeout: Duration,
}

impl PostgresPasswordResetStore {
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
impl PasswordResetStore for PostgresPasswordResetStore {
    #[tracing::instrument(name = "Issuing password reset token in PostgreSQL", skip_all)]
    async fn issue(
        &self,
        token: NewPasswordResetToken,
    ) -> Result<PasswordResetTokenRecord, StoreError> {
        // Retiring the outstanding tokens and inserting the replacement in
        // one transaction keeps "at most one live reset link per user" true
        // under concurrent requests.
        let row: ResetTokenRow = with_timeout(self.call_timeout, async {
            let mut tx = self.pool.begin().await?;

            sqlx::query(
                r"
                UPDATE password_reset_tokens
                SET used_at = NOW()
                WHERE user_id = $1 AND used_at IS NULL
                ",
            )
            .bind(token.user_id)
            .execute(&mut *tx)
            .await?;

            let row: ResetTokenRow = sqlx::query_as(
                r"
                INSERT INTO password_reset_tokens (id, user_id, token_hash, expires_at)
                VALUES ($1, $2, $3, $4)
                RETURNING id, user_id, token_hash, expires_at, used_at, created_at
                ",
            )
            .bind(token.id)
            .bind(token.user_id)
            .bind(token.token_hash.expose_secret())
            .bind(token.expires_at)
            .fetch_one(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok(row)
        })
        .await?;

        tracing::info!(user_id = %row.user_id, "password reset token issued");
        Ok(row.into())
    }

    async fn invalidate_all_for_user(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let result = with_timeout(
            self.call_timeout,
            sqlx::query(
                r"
                UPDATE password_reset_tokens
                SET used_at = NOW()
                WHERE user_id = $1 AND used_at IS NULL
                ",
            )
            .bind(user_id)
            .execute(&self.pool),
        )
        .await?;

        Ok(result.rows_affected())
    }

    async fn get_valid_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<PasswordResetTokenRecord>, StoreError> {
        let row: Option<ResetTokenRow> = with_timeout(
            self.call_timeout,
            sqlx::query_as(
                r"
                SELECT id, user_id, token_hash, expires_at, used_at, created_at
                FROM password_reset_tokens
                WHERE user_id = $1
                  AND used_at IS NULL
                  AND expires_at > NOW()
                ORDER BY created_at DESC
                LIMIT 1
                ",
            )
            .bind(user_id)
            .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.map(Into::into))
    }

    #[tracing::instrument(name = "Consuming password reset token in PostgreSQL", skip_all)]
    async fn mark_used(&self, id: Uuid) -> Result<bool, StoreError> {
        // Single-consumption guarantee: the used_at guard lets exactly one
        // concurrent reset win.
        let result = with_timeout(
            self.call_timeout,
            sqlx::query(
                r"
                UPDATE password_reset_tokens
                SET used_at = NOW()
                WHERE id = $1 AND used_at IS NULL
                ",
            )
            .bind(id)
            .execute(&self.pool),
        )
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn cleanup_expired(&self, retention: chrono::Duration) -> Result<u64, StoreError> {
        let cutoff = Utc::now() - retention;
        let result = with_timeout(
            self.call_timeout,
            sqlx::query("DELETE FROM password_reset_tokens WHERE expires_at < $1")
                .bind(cutoff)
                .execute(&self.pool),
        )
        .await?;

        let count = result.rows_affected();
        if count > 0 {
            tracing::info!(count, "expired password reset tokens purged");
        }
        Ok(count)
    }
}
