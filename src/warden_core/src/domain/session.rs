use chrono::{DateTime, Utc};
use secrecy::Secret;
use uuid::Uuid;

use crate::domain::email::Email;

/// Client details captured when credentials are exercised, for session
/// auditing. Both fields are optional; callers behind proxies may have
/// neither.
#[derive(Debug, Clone, Default)]
pub struct ClientMeta {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

/// A persisted refresh token. Only the hash of the bearer secret is stored;
/// the secret itself is returned to the client exactly once at issuance.
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: Secret<String>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

impl RefreshTokenRecord {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.expires_at > now
    }
}

#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    /// Chosen by the issuer so it can be embedded in the bearer string.
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: Secret<String>,
    pub expires_at: DateTime<Utc>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

/// A persisted password reset token. Consumed at most once (`used_at`).
#[derive(Debug, Clone)]
pub struct PasswordResetTokenRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: Secret<String>,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PasswordResetTokenRecord {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.used_at.is_none() && self.expires_at > now
    }
}

#[derive(Debug, Clone)]
pub struct NewPasswordResetToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: Secret<String>,
    pub expires_at: DateTime<Utc>,
}

/// One row in the append-only login audit log.
#[derive(Debug, Clone)]
pub struct LoginAttempt {
    pub id: Uuid,
    pub email: Email,
    pub success: bool,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Failure statistics for one email over the lockout window, produced by a
/// single store query so a login costs one round-trip, not two.
#[derive(Debug, Clone, Copy)]
pub struct FailedWindow {
    pub count: u32,
    pub oldest: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OAuthProvider {
    Google,
    Microsoft,
}

impl OAuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::Microsoft => "microsoft",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "google" => Some(OAuthProvider::Google),
            "microsoft" => Some(OAuthProvider::Microsoft),
            _ => None,
        }
    }
}

impl std::fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A link between a local user and an external identity provider account.
/// The (provider, provider_user_id) pair maps to exactly one user.
#[derive(Debug, Clone)]
pub struct OAuthAccount {
    pub id: Uuid,
    pub user_id: Uuid,
    pub provider: OAuthProvider,
    pub provider_user_id: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOAuthAccount {
    pub user_id: Uuid,
    pub provider: OAuthProvider,
    pub provider_user_id: String,
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn test_refresh_token_validity() {
        let now = Utc::now();
        let mut record = RefreshTokenRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token_hash: Secret::from("hash".to_string()),
            expires_at: now + Duration::days(1),
            revoked_at: None,
            created_at: now,
            user_agent: None,
            ip_address: None,
        };
        assert!(record.is_valid_at(now));

        record.revoked_at = Some(now);
        assert!(!record.is_valid_at(now));

        record.revoked_at = None;
        record.expires_at = now - Duration::seconds(1);
        assert!(!record.is_valid_at(now));
    }

    #[test]
    fn test_provider_round_trips_through_str() {
        for provider in [OAuthProvider::Google, OAuthProvider::Microsoft] {
            assert_eq!(OAuthProvider::parse(provider.as_str()), Some(provider));
        }
        assert_eq!(OAuthProvider::parse("github"), None);
    }
}
