//! End-to-end flows over the in-memory stores with the real Argon2 hasher
//! and JWT issuer, wired the way an embedding service would wire them.

use chrono::Duration;
use secrecy::{ExposeSecret, Secret};

use warden_adapters::email::MockEmailClient;
use warden_adapters::persistence::{
    HashMapLoginAttemptStore, HashMapOAuthAccountStore, HashMapPasswordResetStore,
    HashMapRefreshTokenStore, HashMapUserStore,
};
use warden_adapters::security::{Argon2CredentialHasher, Argon2Settings};
use warden_adapters::token::{JwtIssuerConfig, JwtTokenIssuer};
use warden_application::{AuthError, AuthService};
use warden_core::{AuthPolicy, ClientMeta, LockoutPolicy, OAuthProvider};

type TestAuthService = AuthService<
    HashMapUserStore,
    HashMapRefreshTokenStore,
    HashMapPasswordResetStore,
    HashMapLoginAttemptStore,
    HashMapOAuthAccountStore,
    Argon2CredentialHasher,
    JwtTokenIssuer,
    MockEmailClient,
>;

struct TestApp {
    service: TestAuthService,
    attempts: HashMapLoginAttemptStore,
    mailer: MockEmailClient,
}

fn test_app() -> TestApp {
    let attempts = HashMapLoginAttemptStore::new();
    let mailer = MockEmailClient::new();
    // Minimal Argon2 cost so the suite stays fast; production parameters
    // come from configuration.
    let hasher = Argon2CredentialHasher::new(Argon2Settings {
        memory_kib: 8,
        iterations: 1,
        parallelism: 1,
    });
    let issuer = JwtTokenIssuer::new(JwtIssuerConfig {
        secret: Secret::from("integration-test-secret".to_string()),
        default_ttl: Duration::minutes(15),
    });
    let policy = AuthPolicy {
        lockout: LockoutPolicy {
            max_failed_attempts: 5,
            window: Duration::minutes(15),
        },
        ..AuthPolicy::default()
    };
    let service = AuthService::new(
        HashMapUserStore::new(),
        HashMapRefreshTokenStore::new(),
        HashMapPasswordResetStore::new(),
        attempts.clone(),
        HashMapOAuthAccountStore::new(),
        hasher,
        issuer,
        mailer.clone(),
        policy,
    );
    TestApp {
        service,
        attempts,
        mailer,
    }
}

fn s(raw: &str) -> Secret<String> {
    Secret::from(raw.to_string())
}

fn meta() -> ClientMeta {
    ClientMeta {
        user_agent: Some("integration-tests".to_string()),
        ip_address: Some("127.0.0.1".to_string()),
    }
}

#[tokio::test]
async fn register_succeeds_once_and_conflicts_after() {
    let app = test_app();

    let session = app
        .service
        .register(s("a@x.com"), s("Aa11aaaa"), "Ann".to_string(), meta())
        .await
        .unwrap();
    assert!(!session.access_token.expose_secret().is_empty());
    assert!(!session.refresh_token.expose_secret().is_empty());

    let second = app
        .service
        .register(s("A@x.com"), s("Aa11aaaa"), "Ann".to_string(), meta())
        .await;
    assert!(matches!(second, Err(AuthError::Conflict(_))));
}

#[tokio::test]
async fn login_round_trip_and_current_user() {
    let app = test_app();
    app.service
        .register(s("a@x.com"), s("Aa11aaaa"), "Ann".to_string(), meta())
        .await
        .unwrap();

    let session = app
        .service
        .login(s("a@x.com"), s("Aa11aaaa"), meta())
        .await
        .unwrap();

    let user = app
        .service
        .current_user(session.access_token.expose_secret())
        .await
        .unwrap();
    assert_eq!(user.id, session.user.id);
    assert_eq!(user.name, "Ann");
}

#[tokio::test]
async fn current_user_rejects_a_tampered_token() {
    let app = test_app();
    let session = app
        .service
        .register(s("a@x.com"), s("Aa11aaaa"), "Ann".to_string(), meta())
        .await
        .unwrap();

    let tampered = format!("{}x", session.access_token.expose_secret());
    let result = app.service.current_user(&tampered).await;
    assert!(matches!(result, Err(AuthError::Authentication(_))));
}

#[tokio::test]
async fn five_failures_then_the_correct_password_hits_the_lockout() {
    let app = test_app();
    app.service
        .register(s("a@x.com"), s("Aa11aaaa"), "Ann".to_string(), meta())
        .await
        .unwrap();

    for _ in 0..5 {
        let err = app
            .service
            .login(s("a@x.com"), s("WrongPass1"), meta())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Authentication(_)));
    }

    match app.service.login(s("a@x.com"), s("Aa11aaaa"), meta()).await {
        Err(AuthError::RateLimit { retry_after_secs }) => assert!(retry_after_secs > 0),
        other => panic!("expected rate limit, got {other:?}"),
    }

    // Once the failures age past the window the same credentials work.
    app.attempts.backdate_all(Duration::minutes(16)).await;
    assert!(
        app.service
            .login(s("a@x.com"), s("Aa11aaaa"), meta())
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn refresh_rotates_and_blocks_replay() {
    let app = test_app();
    let session = app
        .service
        .register(s("a@x.com"), s("Aa11aaaa"), "Ann".to_string(), meta())
        .await
        .unwrap();

    let rotated = app
        .service
        .refresh(session.refresh_token.clone(), meta())
        .await
        .unwrap();
    assert_ne!(
        rotated.refresh_token.expose_secret(),
        session.refresh_token.expose_secret()
    );

    let replay = app.service.refresh(session.refresh_token, meta()).await;
    assert!(matches!(replay, Err(AuthError::Authentication(_))));

    // The rotated-in bearer still works.
    assert!(app.service.refresh(rotated.refresh_token, meta()).await.is_ok());
}

#[tokio::test]
async fn logout_with_bearer_leaves_other_sessions_alive() {
    let app = test_app();
    let first = app
        .service
        .register(s("a@x.com"), s("Aa11aaaa"), "Ann".to_string(), meta())
        .await
        .unwrap();
    let second = app
        .service
        .login(s("a@x.com"), s("Aa11aaaa"), meta())
        .await
        .unwrap();
    let user_id = first.user.id;
    assert_eq!(app.service.valid_sessions(user_id).await.unwrap().len(), 2);

    app.service
        .logout(user_id, Some(first.refresh_token.clone()))
        .await
        .unwrap();
    assert_eq!(app.service.valid_sessions(user_id).await.unwrap().len(), 1);

    // The revoked session cannot refresh, the surviving one can.
    assert!(app.service.refresh(first.refresh_token, meta()).await.is_err());
    assert!(app.service.refresh(second.refresh_token, meta()).await.is_ok());
}

#[tokio::test]
async fn logout_without_bearer_revokes_everything() {
    let app = test_app();
    let session = app
        .service
        .register(s("a@x.com"), s("Aa11aaaa"), "Ann".to_string(), meta())
        .await
        .unwrap();
    app.service
        .login(s("a@x.com"), s("Aa11aaaa"), meta())
        .await
        .unwrap();

    let revoked = app.service.logout(session.user.id, None).await.unwrap();
    assert_eq!(revoked, 2);
    assert!(app.service.valid_sessions(session.user.id).await.unwrap().is_empty());
}

/// Pull the reset secret out of the most recent captured email.
async fn last_reset_code(mailer: &MockEmailClient) -> Secret<String> {
    let sent = mailer.sent().await;
    let content = &sent.last().expect("a reset email was sent").content;
    Secret::from(content.lines().last().unwrap().to_string())
}

#[tokio::test]
async fn password_reset_end_to_end() {
    let app = test_app();
    let session = app
        .service
        .register(s("a@x.com"), s("Aa11aaaa"), "Ann".to_string(), meta())
        .await
        .unwrap();

    app.service.request_password_reset(s("a@x.com")).await.unwrap();
    let code = last_reset_code(&app.mailer).await;

    app.service
        .reset_password(s("a@x.com"), code.clone(), s("NewPass11"))
        .await
        .unwrap();

    // Old password dead, new password live.
    assert!(app.service.login(s("a@x.com"), s("Aa11aaaa"), meta()).await.is_err());
    assert!(app.service.login(s("a@x.com"), s("NewPass11"), meta()).await.is_ok());

    // The reset revoked the pre-existing session.
    assert!(app.service.refresh(session.refresh_token, meta()).await.is_err());

    // And the code was consumed.
    let again = app
        .service
        .reset_password(s("a@x.com"), code, s("OtherPass22"))
        .await;
    assert!(matches!(again, Err(AuthError::Authentication(_))));
}

#[tokio::test]
async fn requesting_a_new_reset_invalidates_the_old_code() {
    let app = test_app();
    app.service
        .register(s("a@x.com"), s("Aa11aaaa"), "Ann".to_string(), meta())
        .await
        .unwrap();

    app.service.request_password_reset(s("a@x.com")).await.unwrap();
    let first_code = last_reset_code(&app.mailer).await;

    app.service.request_password_reset(s("a@x.com")).await.unwrap();
    let second_code = last_reset_code(&app.mailer).await;

    let stale = app
        .service
        .reset_password(s("a@x.com"), first_code, s("NewPass11"))
        .await;
    assert!(matches!(stale, Err(AuthError::Authentication(_))));

    assert!(
        app.service
            .reset_password(s("a@x.com"), second_code, s("NewPass11"))
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn reset_requests_for_unknown_emails_are_indistinguishable() {
    let app = test_app();
    assert!(app.service.request_password_reset(s("ghost@x.com")).await.is_ok());
    assert!(app.service.request_password_reset(s("not-an-email")).await.is_ok());
    assert!(app.mailer.sent().await.is_empty());
}

#[tokio::test]
async fn oauth_authenticate_is_stable_across_profile_changes() {
    let app = test_app();

    let first = app
        .service
        .oauth_authenticate(
            OAuthProvider::Google,
            "google-42".to_string(),
            s("ann@x.com"),
            "Ann".to_string(),
            meta(),
        )
        .await
        .unwrap();
    assert!(first.user.email_verified);
    assert!(!first.user.has_password());

    let second = app
        .service
        .oauth_authenticate(
            OAuthProvider::Google,
            "google-42".to_string(),
            s("changed@elsewhere.com"),
            "Changed".to_string(),
            meta(),
        )
        .await
        .unwrap();
    assert_eq!(first.user.id, second.user.id);

    // A passwordless account cannot log in with a password.
    let err = app
        .service
        .login(s("ann@x.com"), s("Aa11aaaa"), meta())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Authentication(_)));
}

#[tokio::test]
async fn deactivation_revokes_sessions_and_frees_nothing_else() {
    let app = test_app();
    let session = app
        .service
        .register(s("a@x.com"), s("Aa11aaaa"), "Ann".to_string(), meta())
        .await
        .unwrap();

    assert!(app.service.deactivate_user(session.user.id).await.unwrap());
    assert!(app.service.login(s("a@x.com"), s("Aa11aaaa"), meta()).await.is_err());
    assert!(app.service.refresh(session.refresh_token, meta()).await.is_err());
    // Second deactivation is a no-op.
    assert!(!app.service.deactivate_user(session.user.id).await.unwrap());
}

#[tokio::test]
async fn cleanup_reports_purged_rows() {
    let app = test_app();
    app.service
        .register(s("a@x.com"), s("Aa11aaaa"), "Ann".to_string(), meta())
        .await
        .unwrap();
    let _ = app.service.login(s("a@x.com"), s("WrongPass1"), meta()).await;

    app.attempts.backdate_all(Duration::days(40)).await;
    let report = app.service.cleanup_expired(Duration::days(30)).await.unwrap();
    assert_eq!(report.login_attempts_deleted, 1);
    // Live refresh tokens are untouched.
    assert_eq!(report.refresh_tokens_deleted, 0);
}
