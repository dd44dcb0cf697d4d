//! # Warden - Credential Issuance & Session Lifecycle Library
//!
//! This is a facade crate that re-exports all public APIs from the auth core
//! components. Use this crate to get access to the whole library in one place.
//!
//! ## Usage
//!
//! Add to your `Cargo.toml`:
//! ```toml
//! [dependencies]
//! warden = { path = "../warden" }
//! ```
//!
//! ## Structure
//!
//! - **Core domain types**: `Email`, `Password`, `User`, token records, etc.
//! - **Port traits**: `UserStore`, `RefreshTokenStore`, `PasswordResetStore`,
//!   `LoginAttemptStore`, `OAuthAccountStore`, `CredentialHasher`,
//!   `TokenIssuer`, `EmailClient`
//! - **Use cases**: `RegisterUseCase`, `LoginUseCase`, etc.
//! - **Adapters**: `PostgresUserStore`, `Argon2CredentialHasher`,
//!   `JwtTokenIssuer`, `PostmarkEmailClient`, and in-memory stores
//! - **Service**: `AuthService` - the orchestrator the routing layer calls

// ============================================================================
// Core Domain Types
// ============================================================================

/// Core domain types and value objects
pub mod core {
    pub use warden_core::*;
}

// Re-export most commonly used core types at the root level
pub use warden_core::{
    AccessTokenClaims, AccessTokenRequest, AuthPolicy, ClientMeta, Email, LockoutPolicy,
    OAuthAccount, OAuthProvider, Password, PasswordPolicy, RefreshBearer, TokenError, User,
};

// ============================================================================
// Port Traits
// ============================================================================

/// Port trait definitions
pub mod ports {
    pub use warden_core::ports::services::*;
    pub use warden_core::ports::stores::*;
}

// Re-export port traits at root level
pub use warden_core::{
    CredentialHasher, EmailClient, LoginAttemptStore, OAuthAccountStore, PasswordResetStore,
    RefreshTokenStore, StoreError, TokenIssuer, UserStore,
};

// ============================================================================
// Use Cases (Application Layer)
// ============================================================================

/// Application use cases
pub mod use_cases {
    pub use warden_application::use_cases::*;
}

// Re-export use cases and the error taxonomy at root level
pub use warden_application::{
    AuthError, AuthSession, LoginTracker, LoginUseCase, LogoutUseCase, OAuthAuthenticateUseCase,
    RefreshUseCase, RegisterUseCase, RequestPasswordResetUseCase, ResetPasswordUseCase,
};

// ============================================================================
// Adapters (Infrastructure)
// ============================================================================

/// Infrastructure adapters
pub mod adapters {
    /// Persistence implementations
    pub mod persistence {
        pub use warden_adapters::persistence::*;
    }

    /// Email client implementations
    pub mod email {
        pub use warden_adapters::email::*;
    }

    /// Credential hashing
    pub mod security {
        pub use warden_adapters::security::*;
    }

    /// Access token issuance
    pub mod token {
        pub use warden_adapters::token::*;
    }

    /// Configuration
    pub mod config {
        pub use warden_adapters::config::*;
    }

    /// Log-field redaction
    pub mod logging {
        pub use warden_adapters::logging::*;
    }
}

// Re-export commonly used adapters at root level
pub use warden_adapters::{
    config::Settings,
    email::{MockEmailClient, PostmarkEmailClient},
    persistence::{
        HashMapLoginAttemptStore, HashMapOAuthAccountStore, HashMapPasswordResetStore,
        HashMapRefreshTokenStore, HashMapUserStore, PostgresLoginAttemptStore,
        PostgresOAuthAccountStore, PostgresPasswordResetStore, PostgresRefreshTokenStore,
        PostgresUserStore, connect_and_migrate, connect_pool,
    },
    security::Argon2CredentialHasher,
    token::JwtTokenIssuer,
};

// ============================================================================
// Auth Service (Main Entry Point)
// ============================================================================

/// The auth orchestrator
pub use warden_application::{AuthService, CleanupReport};

// ============================================================================
// Re-export common external dependencies
// ============================================================================

/// Re-export async-trait for implementing port traits
pub use async_trait::async_trait;

/// Re-export secrecy for working with secrets
pub use secrecy::{ExposeSecret, Secret};
