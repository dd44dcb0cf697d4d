use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

use regex::Regex;
use secrecy::{ExposeSecret, Secret};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("email address is not valid")]
    Invalid,
}

/// A validated, normalized email address.
///
/// The address is lowercased and trimmed on parse, so equality and hashing
/// are case-insensitive by construction. The inner value is secrecy-wrapped
/// so it never shows up in `Debug` output or logs.
#[derive(Clone)]
pub struct Email(Secret<String>);

impl Email {
    pub fn parse(raw: Secret<String>) -> Result<Self, EmailError> {
        let normalized = raw.expose_secret().trim().to_lowercase();
        if !email_regex().is_match(&normalized) {
            return Err(EmailError::Invalid);
        }
        Ok(Self(Secret::from(normalized)))
    }

    /// Partially masked rendition for log lines: everything but the last
    /// four characters is dropped.
    pub fn masked(&self) -> String {
        let value = self.0.expose_secret();
        if value.chars().count() > 4 {
            let tail: String = value
                .chars()
                .skip(value.chars().count() - 4)
                .collect();
            format!("***{tail}")
        } else {
            "***".to_string()
        }
    }
}

impl TryFrom<Secret<String>> for Email {
    type Error = EmailError;

    fn try_from(raw: Secret<String>) -> Result<Self, Self::Error> {
        Self::parse(raw)
    }
}

impl AsRef<Secret<String>> for Email {
    fn as_ref(&self) -> &Secret<String> {
        &self.0
    }
}

impl PartialEq for Email {
    fn eq(&self, other: &Self) -> bool {
        self.0.expose_secret() == other.0.expose_secret()
    }
}

impl Eq for Email {}

impl Hash for Email {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.expose_secret().hash(state);
    }
}

impl fmt::Debug for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Email({})", self.masked())
    }
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email pattern"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(raw: &str) -> Result<Email, EmailError> {
        Email::parse(Secret::from(raw.to_string()))
    }

    #[test]
    fn test_parse_valid_email() {
        let parsed = email("user@example.com").unwrap();
        assert_eq!(parsed.as_ref().expose_secret(), "user@example.com");
    }

    #[test]
    fn test_parse_normalizes_case_and_whitespace() {
        let parsed = email("  User@Example.COM ").unwrap();
        assert_eq!(parsed.as_ref().expose_secret(), "user@example.com");
    }

    #[test]
    fn test_parse_rejects_invalid() {
        assert!(email("not-an-email").is_err());
        assert!(email("missing@tld").is_err());
        assert!(email("two words@example.com").is_err());
        assert!(email("").is_err());
    }

    #[test]
    fn test_equality_is_case_insensitive() {
        let a = email("User@Example.com").unwrap();
        let b = email("user@example.COM").unwrap();
        assert_eq!(a, b);

        let mut map = std::collections::HashMap::new();
        map.insert(a, 1);
        assert!(map.contains_key(&b));
    }

    #[test]
    fn test_debug_does_not_print_full_address() {
        let parsed = email("secret.user@example.com").unwrap();
        let rendered = format!("{parsed:?}");
        assert!(!rendered.contains("secret.user"));
    }

    #[test]
    fn test_masked_keeps_last_four_chars() {
        let parsed = email("a@x.com").unwrap();
        assert_eq!(parsed.masked(), "***.com");
    }
}
