use thiserror::Error;
use warden_core::{HasherError, StoreError, TokenError, TokenGenerationError};

/// The one message returned for every credential failure on login, whether
/// the account is missing, passwordless, or the password is wrong. Keeping
/// the cases indistinguishable denies attackers an account-enumeration
/// signal.
pub const INVALID_CREDENTIALS: &str = "invalid email or password";

/// The error taxonomy the routing layer sees.
///
/// Everything a flow can fail with collapses into one of these six shapes;
/// storage- and crypto-specific errors are translated before they get here.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Client-correctable bad input, e.g. a weak password.
    #[error("{0}")]
    Validation(String),
    /// Invalid or expired credentials or tokens.
    #[error("{0}")]
    Authentication(String),
    /// Duplicate email or duplicate OAuth link.
    #[error("{0}")]
    Conflict(String),
    /// Lockout in effect; carries the seconds until the window frees up.
    #[error("too many failed login attempts, retry in {retry_after_secs} seconds")]
    RateLimit { retry_after_secs: u64 },
    /// Transient storage or delivery trouble; safe to retry.
    #[error("{0}")]
    ServiceUnavailable(String),
    /// Anything else. Logged with context, surfaced without detail.
    #[error("internal error")]
    Internal(String),
}

impl AuthError {
    pub fn invalid_credentials() -> Self {
        Self::Authentication(INVALID_CREDENTIALS.to_string())
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(_) => {
                AuthError::Conflict("a conflicting record already exists".to_string())
            }
            StoreError::ConnectionFailure(_) | StoreError::Timeout => {
                AuthError::ServiceUnavailable("storage temporarily unavailable".to_string())
            }
            StoreError::ForeignKeyViolation(_)
            | StoreError::CheckViolation(_)
            | StoreError::Other(_) => AuthError::Internal(err.to_string()),
        }
    }
}

impl From<HasherError> for AuthError {
    fn from(err: HasherError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Signing(reason) => AuthError::Internal(reason),
            other => AuthError::Authentication(other.to_string()),
        }
    }
}

impl From<TokenGenerationError> for AuthError {
    fn from(err: TokenGenerationError) -> Self {
        AuthError::Internal(err.to_string())
    }
}
