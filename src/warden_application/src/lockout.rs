use chrono::{Duration, Utc};

use warden_core::{ClientMeta, Email, LockoutPolicy, LoginAttemptStore, StoreError};

/// Sliding-window brute-force protection over the login attempt log.
///
/// Lockout keys on the email identifier alone; a distributed attack from
/// many IPs against many accounts is out of scope here and belongs to
/// upstream rate limiting.
pub struct LoginTracker<S> {
    store: S,
    policy: LockoutPolicy,
}

impl<S> LoginTracker<S>
where
    S: LoginAttemptStore,
{
    pub fn new(store: S, policy: LockoutPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &LockoutPolicy {
        &self.policy
    }

    #[tracing::instrument(name = "LoginTracker::record_attempt", skip_all)]
    pub async fn record_attempt(
        &self,
        email: &Email,
        success: bool,
        meta: &ClientMeta,
    ) -> Result<(), StoreError> {
        self.store.record(email, success, meta).await?;
        if success {
            tracing::info!(email = %email.masked(), "login attempt succeeded");
        } else {
            tracing::warn!(email = %email.masked(), "login attempt failed");
        }
        Ok(())
    }

    pub async fn count_recent_failed(&self, email: &Email) -> Result<u32, StoreError> {
        let stats = self.store.failed_window(email, self.policy.window).await?;
        Ok(stats.count)
    }

    pub async fn is_locked_out(&self, email: &Email) -> Result<bool, StoreError> {
        Ok(self.lockout_remaining(email).await?.is_some())
    }

    /// Seconds until the oldest qualifying failure ages out of the window,
    /// or `None` when the email is not locked out. Count and oldest
    /// timestamp come from a single store query.
    pub async fn lockout_remaining(&self, email: &Email) -> Result<Option<u64>, StoreError> {
        let stats = self.store.failed_window(email, self.policy.window).await?;
        if stats.count < self.policy.max_failed_attempts {
            return Ok(None);
        }
        let Some(oldest) = stats.oldest else {
            return Ok(None);
        };
        let unlock_at = oldest + self.policy.window;
        let remaining = (unlock_at - Utc::now()).num_seconds().max(1);
        Ok(Some(remaining as u64))
    }

    pub async fn cleanup_old(&self, retention: Duration) -> Result<u64, StoreError> {
        self.store.cleanup_old(retention).await
    }
}

#[cfg(test)]
mod tests {
    use warden_adapters::persistence::HashMapLoginAttemptStore;

    use super::*;
    use crate::test_support::{client_meta, email};

    fn tracker(store: HashMapLoginAttemptStore) -> LoginTracker<HashMapLoginAttemptStore> {
        LoginTracker::new(
            store,
            LockoutPolicy {
                max_failed_attempts: 3,
                window: Duration::minutes(15),
            },
        )
    }

    #[tokio::test]
    async fn test_not_locked_out_below_threshold() {
        let store = HashMapLoginAttemptStore::new();
        let tracker = tracker(store);
        let addr = email("user@example.com");

        for _ in 0..2 {
            tracker
                .record_attempt(&addr, false, &client_meta())
                .await
                .unwrap();
        }

        assert_eq!(tracker.count_recent_failed(&addr).await.unwrap(), 2);
        assert!(!tracker.is_locked_out(&addr).await.unwrap());
        assert_eq!(tracker.lockout_remaining(&addr).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_locked_out_at_threshold_with_positive_remaining() {
        let store = HashMapLoginAttemptStore::new();
        let tracker = tracker(store);
        let addr = email("user@example.com");

        for _ in 0..3 {
            tracker
                .record_attempt(&addr, false, &client_meta())
                .await
                .unwrap();
        }

        assert!(tracker.is_locked_out(&addr).await.unwrap());
        let remaining = tracker.lockout_remaining(&addr).await.unwrap().unwrap();
        assert!(remaining > 0);
        assert!(remaining <= 15 * 60);
    }

    #[tokio::test]
    async fn test_successful_attempts_do_not_count_toward_lockout() {
        let store = HashMapLoginAttemptStore::new();
        let tracker = tracker(store);
        let addr = email("user@example.com");

        for _ in 0..5 {
            tracker
                .record_attempt(&addr, true, &client_meta())
                .await
                .unwrap();
        }

        assert_eq!(tracker.count_recent_failed(&addr).await.unwrap(), 0);
        assert!(!tracker.is_locked_out(&addr).await.unwrap());
    }

    #[tokio::test]
    async fn test_lockout_clears_once_failures_age_out_of_the_window() {
        let store = HashMapLoginAttemptStore::new();
        let tracker = tracker(store.clone());
        let addr = email("user@example.com");

        for _ in 0..3 {
            tracker
                .record_attempt(&addr, false, &client_meta())
                .await
                .unwrap();
        }
        assert!(tracker.is_locked_out(&addr).await.unwrap());

        store.backdate_all(Duration::minutes(16)).await;
        assert!(!tracker.is_locked_out(&addr).await.unwrap());
    }

    #[tokio::test]
    async fn test_lockout_is_per_email() {
        let store = HashMapLoginAttemptStore::new();
        let tracker = tracker(store);
        let locked = email("locked@example.com");
        let other = email("other@example.com");

        for _ in 0..3 {
            tracker
                .record_attempt(&locked, false, &client_meta())
                .await
                .unwrap();
        }

        assert!(tracker.is_locked_out(&locked).await.unwrap());
        assert!(!tracker.is_locked_out(&other).await.unwrap());
    }
}
