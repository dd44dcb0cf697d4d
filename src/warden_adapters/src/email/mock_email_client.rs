use std::sync::Arc;

use secrecy::ExposeSecret;
use tokio::sync::RwLock;

use warden_core::{Email, EmailClient};

/// A message captured by the mock client.
#[derive(Debug, Clone)]
pub struct SentEmail {
    pub recipient: String,
    pub subject: String,
    pub content: String,
}

/// Email client that records instead of sending. Clones share the captured
/// mailbox, so tests can hold one handle and inject another.
#[derive(Debug, Clone, Default)]
pub struct MockEmailClient {
    sent: Arc<RwLock<Vec<SentEmail>>>,
}

impl MockEmailClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<SentEmail> {
        self.sent.read().await.clone()
    }
}

#[async_trait::async_trait]
impl EmailClient for MockEmailClient {
    async fn send_email(
        &self,
        recipient: &Email,
        subject: &str,
        content: &str,
    ) -> Result<(), String> {
        self.sent.write().await.push(SentEmail {
            recipient: recipient.as_ref().expose_secret().clone(),
            subject: subject.to_string(),
            content: content.to_string(),
        });
        Ok(())
    }
}
