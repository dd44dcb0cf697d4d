use chrono::Duration;

/// Password strength requirements. The character-class rules (upper, lower,
/// digit) are fixed; only the length floor is tunable.
#[derive(Debug, Clone, Copy)]
pub struct PasswordPolicy {
    pub min_length: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self { min_length: 8 }
    }
}

/// Sliding-window lockout parameters.
///
/// An email is locked out while the number of failed attempts newer than
/// `now - window` reaches `max_failed_attempts`.
#[derive(Debug, Clone, Copy)]
pub struct LockoutPolicy {
    pub max_failed_attempts: u32,
    pub window: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_failed_attempts: 5,
            window: Duration::minutes(15),
        }
    }
}

/// Everything the orchestrator needs to know that is not a collaborator.
/// Built by the composition root from external configuration; nothing in
/// here is hardcoded at use sites.
#[derive(Debug, Clone, Copy)]
pub struct AuthPolicy {
    pub password: PasswordPolicy,
    pub lockout: LockoutPolicy,
    pub refresh_token_ttl: Duration,
    pub reset_token_ttl: Duration,
}

impl Default for AuthPolicy {
    fn default() -> Self {
        Self {
            password: PasswordPolicy::default(),
            lockout: LockoutPolicy::default(),
            refresh_token_ttl: Duration::days(7),
            reset_token_ttl: Duration::hours(1),
        }
    }
}
