use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use warden_core::{
    ClientMeta, Email, FailedWindow, LoginAttempt, LoginAttemptStore, StoreError,
};

/// In-memory login attempt log for tests and embedded use.
#[derive(Default, Clone)]
pub struct HashMapLoginAttemptStore {
    attempts: Arc<RwLock<Vec<LoginAttempt>>>,
}

impl HashMapLoginAttemptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shift every recorded attempt into the past. Lets tests exercise the
    /// sliding window without sleeping through it.
    pub async fn backdate_all(&self, by: Duration) {
        let mut attempts = self.attempts.write().await;
        for attempt in attempts.iter_mut() {
            attempt.created_at -= by;
        }
    }
}

#[async_trait::async_trait]
impl LoginAttemptStore for HashMapLoginAttemptStore {
    async fn record(
        &self,
        email: &Email,
        success: bool,
        meta: &ClientMeta,
    ) -> Result<LoginAttempt, StoreError> {
        let attempt = LoginAttempt {
            id: Uuid::new_v4(),
            email: email.clone(),
            success,
            ip_address: meta.ip_address.clone(),
            user_agent: meta.user_agent.clone(),
            created_at: Utc::now(),
        };
        self.attempts.write().await.push(attempt.clone());
        Ok(attempt)
    }

    async fn failed_window(
        &self,
        email: &Email,
        window: Duration,
    ) -> Result<FailedWindow, StoreError> {
        let cutoff = Utc::now() - window;
        let attempts = self.attempts.read().await;
        let mut count = 0u32;
        let mut oldest = None;
        for attempt in attempts
            .iter()
            .filter(|a| !a.success && a.email == *email && a.created_at > cutoff)
        {
            count += 1;
            oldest = match oldest {
                Some(current) if current <= attempt.created_at => Some(current),
                _ => Some(attempt.created_at),
            };
        }
        Ok(FailedWindow { count, oldest })
    }

    async fn cleanup_old(&self, retention: Duration) -> Result<u64, StoreError> {
        let cutoff = Utc::now() - retention;
        let mut attempts = self.attempts.write().await;
        let before = attempts.len();
        attempts.retain(|a| a.created_at >= cutoff);
        Ok((before - attempts.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use secrecy::Secret;

    use super::*;

    fn email(raw: &str) -> Email {
        Email::parse(Secret::from(raw.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_failed_window_reports_count_and_oldest_together() {
        let store = HashMapLoginAttemptStore::new();
        let addr = email("a@x.com");
        let meta = ClientMeta::default();

        store.record(&addr, false, &meta).await.unwrap();
        store.record(&addr, false, &meta).await.unwrap();
        store.record(&addr, true, &meta).await.unwrap();

        let window = store
            .failed_window(&addr, Duration::minutes(15))
            .await
            .unwrap();
        assert_eq!(window.count, 2);
        let oldest = window.oldest.unwrap();
        assert!(oldest <= Utc::now());
    }

    #[tokio::test]
    async fn test_attempts_outside_the_window_are_ignored() {
        let store = HashMapLoginAttemptStore::new();
        let addr = email("a@x.com");
        let meta = ClientMeta::default();

        store.record(&addr, false, &meta).await.unwrap();
        store.backdate_all(Duration::minutes(20)).await;
        store.record(&addr, false, &meta).await.unwrap();

        let window = store
            .failed_window(&addr, Duration::minutes(15))
            .await
            .unwrap();
        assert_eq!(window.count, 1);
    }

    #[tokio::test]
    async fn test_cleanup_old_purges_stale_rows() {
        let store = HashMapLoginAttemptStore::new();
        let addr = email("a@x.com");
        let meta = ClientMeta::default();

        store.record(&addr, false, &meta).await.unwrap();
        store.backdate_all(Duration::days(31)).await;
        store.record(&addr, true, &meta).await.unwrap();

        let removed = store.cleanup_old(Duration::days(30)).await.unwrap();
        assert_eq!(removed, 1);
    }
}
