pub mod auth_service;
pub mod error;
pub mod lockout;
pub mod session;
pub mod use_cases;

#[cfg(test)]
pub(crate) mod test_support;

pub use auth_service::{AuthService, CleanupReport};
pub use error::{AuthError, INVALID_CREDENTIALS};
pub use lockout::LoginTracker;
pub use session::AuthSession;
pub use use_cases::{
    LoginUseCase, LogoutUseCase, OAuthAuthenticateUseCase, RefreshUseCase, RegisterUseCase,
    RequestPasswordResetUseCase, ResetPasswordUseCase,
};
