pub mod domain;
pub mod ports;

// Re-export commonly used types for convenience
pub use domain::{
    email::{Email, EmailError},
    password::{Password, PasswordPolicyError},
    policy::{AuthPolicy, LockoutPolicy, PasswordPolicy},
    session::{
        ClientMeta, FailedWindow, LoginAttempt, NewOAuthAccount, NewPasswordResetToken,
        NewRefreshToken, OAuthAccount, OAuthProvider, PasswordResetTokenRecord,
        RefreshTokenRecord,
    },
    token::{
        AccessTokenClaims, AccessTokenRequest, RefreshBearer, SECURE_TOKEN_LEN, TokenError,
        TokenGenerationError, generate_secure_token,
    },
    user::{NewUser, User},
};

pub use ports::{
    services::{CredentialHasher, EmailClient, HasherError, TokenIssuer},
    stores::{
        LoginAttemptStore, OAuthAccountStore, PasswordResetStore, RefreshTokenStore, StoreError,
        UserStore,
    },
};
