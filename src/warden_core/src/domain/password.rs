use std::fmt;

use secrecy::{ExposeSecret, Secret};
use thiserror::Error;

use crate::domain::policy::PasswordPolicy;

/// A plaintext password that satisfied the strength policy.
///
/// Only ever handed to a `CredentialHasher`; the raw value stays inside a
/// `Secret` wrapper for its whole lifetime.
#[derive(Clone)]
pub struct Password(Secret<String>);

/// Strength violations, one per missing character class so callers can tell
/// the user exactly what is wrong.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PasswordPolicyError {
    #[error("password must be at least {0} characters")]
    TooShort(usize),
    #[error("password must contain at least one uppercase letter")]
    MissingUppercase,
    #[error("password must contain at least one lowercase letter")]
    MissingLowercase,
    #[error("password must contain at least one digit")]
    MissingDigit,
}

impl Password {
    pub fn parse(raw: Secret<String>, policy: &PasswordPolicy) -> Result<Self, PasswordPolicyError> {
        let value = raw.expose_secret();
        if value.chars().count() < policy.min_length {
            return Err(PasswordPolicyError::TooShort(policy.min_length));
        }
        if !value.chars().any(|c| c.is_uppercase()) {
            return Err(PasswordPolicyError::MissingUppercase);
        }
        if !value.chars().any(|c| c.is_lowercase()) {
            return Err(PasswordPolicyError::MissingLowercase);
        }
        if !value.chars().any(|c| c.is_ascii_digit()) {
            return Err(PasswordPolicyError::MissingDigit);
        }
        Ok(Self(raw))
    }
}

impl AsRef<Secret<String>> for Password {
    fn as_ref(&self) -> &Secret<String> {
        &self.0
    }
}

impl PartialEq for Password {
    fn eq(&self, other: &Self) -> bool {
        self.0.expose_secret() == other.0.expose_secret()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Password(***)")
    }
}
