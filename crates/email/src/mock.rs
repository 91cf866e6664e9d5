//! Mock Email Service Implementation
//!
//! Minimal mock used by `EmailServiceFactory` when provider is `"mock"` or
//! email is disabled. Integration tests reuse this same implementation
//! rather than defining a second one.

use chrono::Utc;
use uuid::Uuid;

use crate::{EmailConfig, EmailError, EmailMessage, EmailReceipt, EmailService};

/// Mock email service for testing
#[derive(Debug, Clone)]
pub struct MockEmailService {
    default_from: String,
    app_base_url: String,
}

impl MockEmailService {
    /// Create a new mock email service
    pub fn new(config: EmailConfig) -> Self {
        Self {
            default_from: config.default_from,
            app_base_url: config.app_base_url,
        }
    }
}

#[async_trait::async_trait]
impl EmailService for MockEmailService {
    async fn send_email(&self, message: EmailMessage) -> Result<EmailReceipt, EmailError> {
        tracing::info!("Mock email service capturing email to: {}", message.to);

        let receipt = EmailReceipt {
            message_id: format!("mock-{}", Uuid::new_v4()),
            sent_at: Utc::now(),
            provider: "mock".to_string(),
            metadata: message.metadata.clone(),
        };

        tracing::info!(
            "Email captured successfully, message ID: {}",
            receipt.message_id
        );

        Ok(receipt)
    }

    fn default_from(&self) -> String {
        self.default_from.clone()
    }

    fn app_base_url(&self) -> &str {
        &self.app_base_url
    }
}
