pub mod hashmap_login_attempt_store;
pub mod hashmap_oauth_account_store;
pub mod hashmap_password_reset_store;
pub mod hashmap_refresh_token_store;
pub mod hashmap_user_store;
pub mod postgres_login_attempt_store;
pub mod postgres_oauth_account_store;
pub mod postgres_password_reset_store;
pub mod postgres_refresh_token_store;
pub mod postgres_user_store;

pub use hashmap_login_attempt_store::HashMapLoginAttemptStore;
pub use hashmap_oauth_account_store::HashMapOAuthAccountStore;
pub use hashmap_password_reset_store::HashMapPasswordResetStore;
pub use hashmap_refresh_token_store::HashMapRefreshTokenStore;
pub use hashmap_user_store::HashMapUserStore;
pub use postgres_login_attempt_store::PostgresLoginAttemptStore;
pub use postgres_oauth_account_store::PostgresOAuthAccountStore;
pub use postgres_password_reset_store::PostgresPasswordResetStore;
pub use postgres_refresh_token_store::PostgresRefreshTokenStore;
pub use postgres_user_store::PostgresUserStore;

use std::future::Future;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::postgres::{PgPool, PgPoolOptions};

use warden_core::StoreError;

use crate::config::DatabaseSettings;

/// Schema migrations for the five auth tables, embedded at compile time.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

pub(crate) const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the connection pool the Postgres stores share.
pub async fn connect_pool(settings: &DatabaseSettings) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .min_connections(settings.min_connections)
        .max_connections(settings.max_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
        .connect(settings.url.expose_secret())
        .await
}

/// Connect and bring the schema up to date in one step.
pub async fn connect_and_migrate(settings: &DatabaseSettings) -> Result<PgPool, sqlx::Error> {
    let pool = connect_pool(settings).await?;
    MIGRATOR.run(&pool).await?;
    Ok(pool)
}

/// Translate a driver error into the tagged store error the ports promise.
/// The application layer matches on the tag, never on sqlx types.
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) => {
            let constraint = db.constraint().unwrap_or_default().to_string();
            if db.is_unique_violation() {
                StoreError::UniqueViolation(constraint)
            } else if db.is_foreign_key_violation() {
                StoreError::ForeignKeyViolation(constraint)
            } else if db.is_check_violation() {
                StoreError::CheckViolation(constraint)
            } else {
                StoreError::Other(db.to_string())
            }
        }
        sqlx::Error::PoolTimedOut => StoreError::Timeout,
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolClosed => {
            StoreError::ConnectionFailure(err.to_string())
        }
        _ => StoreError::Other(err.to_string()),
    }
}

/// Run one storage call under a deadline. A deadline miss surfaces as
/// `StoreError::Timeout`, which the application maps to a retryable
/// service-unavailable error rather than letting the request hang.
pub(crate) async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(map_sqlx_error),
        Err(_) => Err(StoreError::Timeout),
    }
}
