pub mod login;
pub mod logout;
pub mod oauth_authenticate;
pub mod refresh;
pub mod register;
pub mod request_password_reset;
pub mod reset_password;

pub use login::LoginUseCase;
pub use logout::LogoutUseCase;
pub use oauth_authenticate::OAuthAuthenticateUseCase;
pub use refresh::RefreshUseCase;
pub use register::RegisterUseCase;
pub use request_password_reset::RequestPasswordResetUseCase;
pub use reset_password::ResetPasswordUseCase;
