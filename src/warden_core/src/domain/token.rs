use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Duration;
use rand::TryRngCore;
use rand::rngs::OsRng;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// User id.
    pub sub: String,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_role: Option<String>,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
    /// Unique token id, fresh per issuance.
    pub jti: String,
}

/// Inputs to access-token creation.
#[derive(Debug, Clone)]
pub struct AccessTokenRequest {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub org_id: Option<String>,
    pub org_role: Option<String>,
    /// Overrides the issuer's configured TTL when set.
    pub ttl: Option<Duration>,
}

/// Why an access token was rejected. Each decode failure mode gets its own
/// variant so callers can log the reason without parsing messages.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token signature mismatch")]
    SignatureMismatch,
    #[error("token has expired")]
    Expired,
    #[error("malformed token")]
    Malformed,
    #[error("token missing required claim: {0}")]
    MissingClaim(&'static str),
    #[error("failed to sign token: {0}")]
    Signing(String),
}

#[derive(Debug, Error)]
#[error("failed to generate secure token: {0}")]
pub struct TokenGenerationError(pub String);

/// Entropy of generated secrets in bytes.
const SECURE_TOKEN_BYTES: usize = 32;

/// Length of a generated secret: 32 bytes, URL-safe base64, no padding.
pub const SECURE_TOKEN_LEN: usize = 43;

/// Generate an unguessable URL-safe secret from the operating system CSPRNG.
///
/// Used for refresh-token and password-reset bearer secrets. The value is
/// only ever stored hashed.
pub fn generate_secure_token() -> Result<Secret<String>, TokenGenerationError> {
    let mut bytes = [0u8; SECURE_TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| TokenGenerationError(e.to_string()))?;
    Ok(Secret::from(URL_SAFE_NO_PAD.encode(bytes)))
}

/// A refresh bearer split into its two halves.
///
/// The wire format is `"{id}.{secret}"`: the record id is a non-secret
/// lookup key, so the ledger can find the row in one indexed read and then
/// verify the secret half against the stored salted hash. Neither half is
/// useful on its own.
pub struct RefreshBearer {
    pub id: Uuid,
    pub secret: Secret<String>,
}

impl RefreshBearer {
    pub fn compose(id: Uuid, secret: &Secret<String>) -> Secret<String> {
        Secret::from(format!("{id}.{}", secret.expose_secret()))
    }

    /// Split a presented bearer. Returns `None` for anything that is not
    /// `uuid.nonempty-secret`; callers treat that as an invalid token.
    pub fn parse(bearer: &Secret<String>) -> Option<Self> {
        let (id, secret) = bearer.expose_secret().split_once('.')?;
        let id = Uuid::parse_str(id).ok()?;
        if secret.is_empty() {
            return None;
        }
        Some(Self {
            id,
            secret: Secret::from(secret.to_string()),
        })
    }
}
