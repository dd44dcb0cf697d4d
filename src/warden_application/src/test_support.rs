//! Shared fakes for use-case unit tests. Store doubles come from the
//! in-memory adapters; only crypto and token issuance are faked here so the
//! tests stay fast and deterministic.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, Secret};

use warden_core::{
    AccessTokenClaims, AccessTokenRequest, ClientMeta, CredentialHasher, Email, EmailClient,
    HasherError, TokenError, TokenIssuer,
};

pub(crate) fn email(raw: &str) -> Email {
    Email::parse(Secret::from(raw.to_string())).unwrap()
}

pub(crate) fn secret(raw: &str) -> Secret<String> {
    Secret::from(raw.to_string())
}

pub(crate) fn client_meta() -> ClientMeta {
    ClientMeta {
        user_agent: Some("test-agent".to_string()),
        ip_address: Some("127.0.0.1".to_string()),
    }
}

/// Reversible stand-in for Argon2 so tests never pay the work factor.
pub(crate) struct FakeHasher;

#[async_trait]
impl CredentialHasher for FakeHasher {
    async fn hash(&self, secret: &Secret<String>) -> Result<Secret<String>, HasherError> {
        Ok(Secret::from(format!("fake-hash::{}", secret.expose_secret())))
    }

    async fn verify(
        &self,
        candidate: &Secret<String>,
        hash: &Secret<String>,
    ) -> Result<bool, HasherError> {
        Ok(hash.expose_secret() == &format!("fake-hash::{}", candidate.expose_secret()))
    }
}

/// Token issuer whose tokens are `sub|email|name|counter`, decodable without
/// any crypto.
#[derive(Default)]
pub(crate) struct FakeIssuer {
    counter: AtomicU64,
}

impl FakeIssuer {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

impl TokenIssuer for FakeIssuer {
    fn create_access_token(&self, request: &AccessTokenRequest) -> Result<String, TokenError> {
        let jti = self.counter.fetch_add(1, Ordering::Relaxed);
        Ok(format!(
            "{}|{}|{}|{jti}",
            request.user_id, request.email, request.name
        ))
    }

    fn decode_access_token(&self, token: &str) -> Result<AccessTokenClaims, TokenError> {
        let mut parts = token.split('|');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(sub), Some(email), Some(name), Some(jti)) => Ok(AccessTokenClaims {
                sub: sub.to_string(),
                email: email.to_string(),
                name: name.to_string(),
                org_id: None,
                org_role: None,
                iat: 0,
                exp: i64::MAX,
                jti: jti.to_string(),
            }),
            _ => Err(TokenError::Malformed),
        }
    }

    fn is_token_expired(&self, _token: &str, _margin: Duration) -> bool {
        false
    }

    fn token_user_id(&self, token: &str) -> Option<String> {
        token.split('|').next().map(str::to_string)
    }

    fn token_expiry(&self, _token: &str) -> Option<DateTime<Utc>> {
        None
    }
}

/// Email client that always fails, for delivery-error paths.
pub(crate) struct FailingEmailClient;

#[async_trait]
impl EmailClient for FailingEmailClient {
    async fn send_email(
        &self,
        _recipient: &Email,
        _subject: &str,
        _content: &str,
    ) -> Result<(), String> {
        Err("connection refused".to_string())
    }
}
