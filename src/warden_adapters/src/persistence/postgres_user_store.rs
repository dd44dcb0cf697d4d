use std::time::Duration;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, Secret};
use sqlx::PgPool;
use uuid::Uuid;

use warden_core::{Email, NewUser, StoreError, User, UserStore};

use super::{DEFAULT_CALL_TIMEOUT, with_timeout};

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: Option<String>,
    name: String,
    avatar_url: Option<String>,
    email_verified: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(Secret::from(row.email))
            .map_err(|e| StoreError::Other(format!("stored email failed validation: {e}")))?;
        Ok(User {
            id: row.id,
            email,
            name: row.name,
            password_hash: row.password_hash.map(Secret::from),
            avatar_url: row.avatar_url,
            email_verified: row.email_verified,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

#[derive(Clone)]
pub struct PostgresUserStore {
    pool: PgPool,
    call_timeout: Duration,
}

impl PostgresUserStore {
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
impl UserStore for PostgresUserStore {
    #[tracing::instrument(name = "Creating user in PostgreSQL", skip_all)]
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let password_hash = new_user
            .password_hash
            .as_ref()
            .map(|h| h.expose_secret().clone());

        let row: UserRow = with_timeout(
            self.call_timeout,
            sqlx::query_as(
                r"
                INSERT INTO users (email, password_hash, name, email_verified)
                VALUES ($1, $2, $3, $4)
                RETURNING id, email, password_hash, name, avatar_url,
                          email_verified, created_at, updated_at, deleted_at
                ",
            )
            .bind(new_user.email.as_ref().expose_secret())
            .bind(password_hash)
            .bind(&new_user.name)
            .bind(new_user.email_verified)
            .fetch_one(&self.pool),
        )
        .await?;

        let user = User::try_from(row)?;
        tracing::info!(user_id = %user.id, "user created");
        Ok(user)
    }

    #[tracing::instrument(name = "Retrieving user by id from PostgreSQL", skip_all)]
    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let row: Option<UserRow> = with_timeout(
            self.call_timeout,
            sqlx::query_as(
                r"
                SELECT id, email, password_hash, name, avatar_url,
                       email_verified, created_at, updated_at, deleted_at
                FROM users
                WHERE id = $1 AND deleted_at IS NULL
                ",
            )
            .bind(id)
            .fetch_optional(&self.pool),
        )
        .await?;

        row.map(User::try_from).transpose()
    }

    #[tracing::instrument(name = "Retrieving user by email from PostgreSQL", skip_all)]
    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, StoreError> {
        let row: Option<UserRow> = with_timeout(
            self.call_timeout,
            sqlx::query_as(
                r"
                SELECT id, email, password_hash, name, avatar_url,
                       email_verified, created_at, updated_at, deleted_at
                FROM users
                WHERE LOWER(email) = LOWER($1) AND deleted_at IS NULL
                ",
            )
            .bind(email.as_ref().expose_secret())
            .fetch_optional(&self.pool),
        )
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn email_exists(&self, email: &Email) -> Result<bool, StoreError> {
        with_timeout(
            self.call_timeout,
            sqlx::query_scalar(
                r"
                SELECT EXISTS (
                    SELECT 1 FROM users
                    WHERE LOWER(email) = LOWER($1) AND deleted_at IS NULL
                )
                ",
            )
            .bind(email.as_ref().expose_secret())
            .fetch_one(&self.pool),
        )
        .await
    }

    #[tracing::instrument(name = "Updating password hash in PostgreSQL", skip_all)]
    async fn update_password(
        &self,
        id: Uuid,
        password_hash: Secret<String>,
    ) -> Result<bool, StoreError> {
        let result = with_timeout(
            self.call_timeout,
            sqlx::query(
                r"
                UPDATE users
                SET password_hash = $1, updated_at = NOW()
                WHERE id = $2 AND deleted_at IS NULL
                ",
            )
            .bind(password_hash.expose_secret())
            .bind(id)
            .execute(&self.pool),
        )
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn verify_email(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = with_timeout(
            self.call_timeout,
            sqlx::query(
                r"
                UPDATE users
                SET email_verified = TRUE, updated_at = NOW()
                WHERE id = $1 AND deleted_at IS NULL
                ",
            )
            .bind(id)
            .execute(&self.pool),
        )
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        name: Option<String>,
        avatar_url: Option<String>,
    ) -> Result<Option<User>, StoreError> {
        // None means "leave unchanged", so the two optional fields collapse
        // into one statement instead of dynamic SQL.
        let row: Option<UserRow> = with_timeout(
            self.call_timeout,
            sqlx::query_as(
                r"
                UPDATE users
                SET name = COALESCE($1, name),
                    avatar_url = COALESCE($2, avatar_url),
                    updated_at = NOW()
                WHERE id = $3 AND deleted_at IS NULL
                RETURNING id, email, password_hash, name, avatar_url,
                          email_verified, created_at, updated_at, deleted_at
                ",
            )
            .bind(name)
            .bind(avatar_url)
            .bind(id)
            .fetch_optional(&self.pool),
        )
        .await?;

        row.map(User::try_from).transpose()
    }

    #[tracing::instrument(name = "Soft-deleting user in PostgreSQL", skip_all)]
    async fn soft_delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = with_timeout(
            self.call_timeout,
            sqlx::query(
                r"
                UPDATE users
                SET deleted_at = NOW(), updated_at = NOW()
                WHERE id = $1 AND deleted_at IS NULL
                ",
            )
            .bind(id)
            .execute(&self.pool),
        )
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
