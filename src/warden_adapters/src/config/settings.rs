use chrono::Duration;
use secrecy::Secret;
use serde::Deserialize;

use warden_core::{AuthPolicy, LockoutPolicy, PasswordPolicy};

use crate::security::Argon2Settings;
use crate::token::JwtIssuerConfig;

/// Externally supplied configuration for the whole auth core. Loaded once
/// at startup by the composition root and turned into concrete policy,
/// issuer, and hasher inputs through the accessors below; nothing reads
/// configuration globally.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub email: Option<EmailSettings>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: Secret<String>,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
    /// Deadline for each individual storage call.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
}

impl DatabaseSettings {
    pub fn call_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.call_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    pub jwt_secret: Secret<String>,
    #[serde(default = "default_access_token_ttl_minutes")]
    pub access_token_ttl_minutes: i64,
    #[serde(default = "default_refresh_token_ttl_days")]
    pub refresh_token_ttl_days: i64,
    #[serde(default = "default_reset_token_ttl_hours")]
    pub reset_token_ttl_hours: i64,
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,
    #[serde(default = "default_max_login_attempts")]
    pub max_login_attempts: u32,
    #[serde(default = "default_lockout_window_minutes")]
    pub lockout_window_minutes: i64,
    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,
}

impl AuthSettings {
    pub fn policy(&self) -> AuthPolicy {
        AuthPolicy {
            password: PasswordPolicy {
                min_length: self.min_password_length,
            },
            lockout: LockoutPolicy {
                max_failed_attempts: self.max_login_attempts,
                window: Duration::minutes(self.lockout_window_minutes),
            },
            refresh_token_ttl: Duration::days(self.refresh_token_ttl_days),
            reset_token_ttl: Duration::hours(self.reset_token_ttl_hours),
        }
    }

    pub fn issuer_config(&self) -> JwtIssuerConfig {
        JwtIssuerConfig {
            secret: self.jwt_secret.clone(),
            default_ttl: Duration::minutes(self.access_token_ttl_minutes),
        }
    }

    pub fn argon2(&self) -> Argon2Settings {
        Argon2Settings {
            memory_kib: self.argon2_memory_kib,
            iterations: self.argon2_iterations,
            parallelism: self.argon2_parallelism,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailSettings {
    pub base_url: String,
    pub sender: String,
    pub authorization_token: Secret<String>,
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,
}

impl Settings {
    /// Layered load: an optional `warden.json` next to the binary, then
    /// `WARDEN__`-prefixed environment variables (section separator `__`,
    /// e.g. `WARDEN__AUTH__JWT_SECRET`).
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        config::Config::builder()
            .add_source(config::File::with_name("warden").required(false))
            .add_source(config::Environment::with_prefix("WARDEN").separator("__"))
            .build()?
            .try_deserialize()
    }
}

fn default_min_connections() -> u32 {
    2
}
fn default_max_connections() -> u32 {
    10
}
fn default_acquire_timeout_secs() -> u64 {
    5
}
fn default_call_timeout_secs() -> u64 {
    30
}
fn default_access_token_ttl_minutes() -> i64 {
    15
}
fn default_refresh_token_ttl_days() -> i64 {
    7
}
fn default_reset_token_ttl_hours() -> i64 {
    1
}
fn default_min_password_length() -> usize {
    8
}
fn default_max_login_attempts() -> u32 {
    5
}
fn default_lockout_window_minutes() -> i64 {
    15
}
fn default_argon2_memory_kib() -> u32 {
    15000
}
fn default_argon2_iterations() -> u32 {
    2
}
fn default_argon2_parallelism() -> u32 {
    1
}
fn default_send_timeout_secs() -> u64 {
    10
}
