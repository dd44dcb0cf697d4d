use std::time::Duration;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, Secret};
use sqlx::PgPool;
use uuid::Uuid;

use warden_core::{
    ClientMeta, Email, FailedWindow, LoginAttempt, LoginAttemptStore, StoreError,
};

use super::{DEFAULT_CALL_TIMEOUT, with_timeout};

#[derive(Debug, sqlx::FromRow)]
struct LoginAttemptRow {
    id: Uuid,
    email: String,
    success: bool,
    ip_address: Option<String>,
    user_agent: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<LoginAttemptRow> for LoginAttempt {
    type Error = StoreError;

    fn try_from(row: LoginAttemptRow) -> Result<Self, Self::Error> {
        let email = Email::parse(Secret::from(row.email))
            .map_err(|e| StoreError::Other(format!("stored email failed validation: {e}")))?;
        Ok(LoginAttempt {
            id: row.id,
            email,
            success: row.success,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            created_at: row.created_at,
        })
    }
}

#[derive(Clone)]
pub struct PostgresLoginAttemptStore {
    pool: PgPool,
    call_timeout: Duration,
}

impl PostgresLoginAttemptStore {
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
impl LoginAttemptStore for PostgresLoginAttemptStore {
    #[tracing::instrument(name = "Recording login attempt in PostgreSQL", skip_all)]
    async fn record(
        &self,
        email: &Email,
        success: bool,
        meta: &ClientMeta,
    ) -> Result<LoginAttempt, StoreError> {
        let row: LoginAttemptRow = with_timeout(
            self.call_timeout,
            sqlx::query_as(
                r"
                INSERT INTO login_attempts (email, success, ip_address, user_agent)
                VALUES ($1, $2, $3, $4)
                RETURNING id, email, success, ip_address, user_agent, created_at
                ",
            )
            .bind(email.as_ref().expose_secret())
            .bind(success)
            .bind(meta.ip_address.as_deref())
            .bind(meta.user_agent.as_deref())
            .fetch_one(&self.pool),
        )
        .await?;

        row.try_into()
    }

    async fn failed_window(
        &self,
        email: &Email,
        window: chrono::Duration,
    ) -> Result<FailedWindow, StoreError> {
        let cutoff = Utc::now() - window;

        // Count and oldest timestamp in one round-trip; a login needs both.
        let (count, oldest): (i64, Option<DateTime<Utc>>) = with_timeout(
            self.call_timeout,
            sqlx::query_as(
                r"
                SELECT COUNT(*), MIN(created_at)
                FROM login_attempts
                WHERE LOWER(email) = LOWER($1)
                  AND success = FALSE
                  AND created_at > $2
                ",
            )
            .bind(email.as_ref().expose_secret())
            .bind(cutoff)
            .fetch_one(&self.pool),
        )
        .await?;

        Ok(FailedWindow {
            count: u32::try_from(count).unwrap_or(u32::MAX),
            oldest,
        })
    }

    async fn cleanup_old(&self, retention: chrono::Duration) -> Result<u64, StoreError> {
        let cutoff = Utc::now() - retention;
        let result = with_timeout(
            self.call_timeout,
            sqlx::query("DELETE FROM login_attempts WHERE created_at < $1")
                .bind(cutoff)
                .execute(&self.pool),
        )
        .await?;

        let count = result.rows_affected();
        if count > 0 {
            tracing::info!(count, "old login attempts purged");
        }
        Ok(count)
    }
}
