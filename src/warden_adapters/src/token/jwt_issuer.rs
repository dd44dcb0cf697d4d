use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use warden_core::{AccessTokenClaims, AccessTokenRequest, TokenError, TokenIssuer};

#[derive(Clone)]
pub struct JwtIssuerConfig {
    pub secret: Secret<String>,
    pub default_ttl: Duration,
}

/// HS256 access token issuer on `jsonwebtoken`.
///
/// Decode runs with zero leeway: a token expired by one second is expired.
#[derive(Clone)]
pub struct JwtTokenIssuer {
    config: JwtIssuerConfig,
}

/// Wire shape of the claims. Optional on the decode side so a missing claim
/// is reported as such rather than as a parse failure.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    #[serde(skip_serializing_if = "Option::is_none")]
    sub: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    org_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    org_role: Option<String>,
    iat: i64,
    exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    jti: Option<String>,
}

impl JwtTokenIssuer {
    pub fn new(config: JwtIssuerConfig) -> Self {
        Self { config }
    }

    fn secret_bytes(&self) -> &[u8] {
        self.config.secret.expose_secret().as_bytes()
    }

    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);
        validation
    }

    /// Read the payload without verifying the signature, for the
    /// best-effort helpers. Critical paths go through
    /// `decode_access_token`.
    fn peek_claims(token: &str) -> Option<Claims> {
        let mut parts = token.split('.');
        let (_header, payload) = (parts.next()?, parts.next()?);
        parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

impl TokenIssuer for JwtTokenIssuer {
    fn create_access_token(&self, request: &AccessTokenRequest) -> Result<String, TokenError> {
        let now = Utc::now();
        let ttl = request.ttl.unwrap_or(self.config.default_ttl);

        let claims = Claims {
            sub: Some(request.user_id.to_string()),
            email: Some(request.email.clone()),
            name: Some(request.name.clone()),
            org_id: request.org_id.clone(),
            org_role: request.org_role.clone(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Some(Uuid::new_v4().to_string()),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret_bytes()),
        )
        .map_err(|e| TokenError::Signing(e.to_string()))
    }

    fn decode_access_token(&self, token: &str) -> Result<AccessTokenClaims, TokenError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret_bytes()),
            &Self::validation(),
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            jsonwebtoken::errors::ErrorKind::InvalidSignature => TokenError::SignatureMismatch,
            jsonwebtoken::errors::ErrorKind::MissingRequiredClaim(_) => {
                TokenError::MissingClaim("exp")
            }
            _ => TokenError::Malformed,
        })?;

        let claims = data.claims;
        let sub = claims.sub.ok_or(TokenError::MissingClaim("sub"))?;
        let email = claims.email.ok_or(TokenError::MissingClaim("email"))?;

        Ok(AccessTokenClaims {
            sub,
            email,
            name: claims.name.unwrap_or_default(),
            org_id: claims.org_id,
            org_role: claims.org_role,
            iat: claims.iat,
            exp: claims.exp,
            jti: claims.jti.unwrap_or_default(),
        })
    }

    fn is_token_expired(&self, token: &str, margin: Duration) -> bool {
        match Self::peek_claims(token) {
            Some(claims) => claims.exp <= (Utc::now() + margin).timestamp(),
            // Undecodable means unusable; treat it as expired.
            None => true,
        }
    }

    fn token_user_id(&self, token: &str) -> Option<String> {
        Self::peek_claims(token)?.sub
    }

    fn token_expiry(&self, token: &str) -> Option<DateTime<Utc>> {
        let claims = Self::peek_claims(token)?;
        DateTime::from_timestamp(claims.exp, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer_with_secret(secret: &str) -> JwtTokenIssuer {
        JwtTokenIssuer::new(JwtIssuerConfig {
            secret: Secret::from(secret.to_string()),
            default_ttl: Duration::minutes(15),
        })
    }

    fn issuer() -> JwtTokenIssuer {
        issuer_with_secret("test-secret")
    }

    fn request(ttl: Option<Duration>) -> AccessTokenRequest {
        AccessTokenRequest {
            user_id: Uuid::new_v4(),
            email: "user@example.com".to_string(),
            name: "Test User".to_string(),
            org_id: None,
            org_role: None,
            ttl,
        }
    }

    #[test]
    fn test_round_trip_preserves_the_claims() {
        let issuer = issuer();
        let request = request(None);

        let token = issuer.create_access_token(&request).unwrap();
        assert_eq!(token.split('.').count(), 3);

        let claims = issuer.decode_access_token(&token).unwrap();
        assert_eq!(claims.sub, request.user_id.to_string());
        assert_eq!(claims.email, "user@example.com");
        assert_eq!(claims.name, "Test User");
        assert!(claims.exp > claims.iat);
        assert!(!claims.jti.is_empty());
    }

    #[test]
    fn test_org_claims_are_carried_when_present() {
        let issuer = issuer();
        let token = issuer
            .create_access_token(&AccessTokenRequest {
                org_id: Some("org-1".to_string()),
                org_role: Some("admin".to_string()),
                ..request(None)
            })
            .unwrap();

        let claims = issuer.decode_access_token(&token).unwrap();
        assert_eq!(claims.org_id.as_deref(), Some("org-1"));
        assert_eq!(claims.org_role.as_deref(), Some("admin"));
    }

    #[test]
    fn test_jti_is_fresh_per_issuance() {
        let issuer = issuer();
        let request = request(None);

        let first = issuer.create_access_token(&request).unwrap();
        let second = issuer.create_access_token(&request).unwrap();

        assert_ne!(
            issuer.decode_access_token(&first).unwrap().jti,
            issuer.decode_access_token(&second).unwrap().jti
        );
    }

    #[test]
    fn test_wrong_secret_is_a_signature_mismatch() {
        let token = issuer_with_secret("secret-a")
            .create_access_token(&request(None))
            .unwrap();

        let result = issuer_with_secret("secret-b").decode_access_token(&token);
        assert_eq!(result.unwrap_err(), TokenError::SignatureMismatch);
    }

    #[test]
    fn test_expired_by_one_second_is_expired() {
        let issuer = issuer();
        let token = issuer
            .create_access_token(&request(Some(Duration::seconds(-1))))
            .unwrap();

        assert_eq!(issuer.decode_access_token(&token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn test_missing_email_claim_is_reported_as_such() {
        let issuer = issuer();
        let claims = serde_json::json!({
            "sub": "some-user",
            "iat": Utc::now().timestamp(),
            "exp": (Utc::now() + Duration::minutes(5)).timestamp(),
        });
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert_eq!(
            issuer.decode_access_token(&token).unwrap_err(),
            TokenError::MissingClaim("email")
        );
    }

    #[test]
    fn test_garbage_is_malformed() {
        let issuer = issuer();
        for raw in ["", "not-a-jwt", "a.b", "a.b.c.d"] {
            assert_eq!(issuer.decode_access_token(raw).unwrap_err(), TokenError::Malformed);
        }
    }

    #[test]
    fn test_is_token_expired_honors_the_margin() {
        let issuer = issuer();
        let token = issuer
            .create_access_token(&request(Some(Duration::seconds(60))))
            .unwrap();

        assert!(!issuer.is_token_expired(&token, Duration::zero()));
        assert!(issuer.is_token_expired(&token, Duration::seconds(120)));
        assert!(issuer.is_token_expired("garbage", Duration::zero()));
    }

    #[test]
    fn test_best_effort_helpers_never_fail() {
        let issuer = issuer();
        let request = request(None);
        let token = issuer.create_access_token(&request).unwrap();

        assert_eq!(
            issuer.token_user_id(&token),
            Some(request.user_id.to_string())
        );
        assert!(issuer.token_expiry(&token).unwrap() > Utc::now());

        assert_eq!(issuer.token_user_id("garbage"), None);
        assert_eq!(issuer.token_expiry("garbage"), None);
    }
}
