//! Payment-provider collaborator.
//!
//! Models the payment provider (a Stripe-shaped billing API) purely as a
//! source of subscription snapshots and signed webhook events, the way the
//! subscription reconciler in `meridian-accounts` consumes it. Provides a
//! real client (`StripePaymentProvider`) and a `MockPaymentProvider` for
//! tests, selected by a factory from configuration — the same
//! trait-plus-mock-plus-factory shape used elsewhere in this workspace for
//! external service collaborators.

pub mod mock;
pub mod stripe_client;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("payment provider configuration error: {0}")]
    Configuration(String),

    #[error("payment provider request error: {0}")]
    Request(String),

    #[error("webhook signature verification failed: {0}")]
    InvalidSignature(String),

    #[error("webhook payload could not be parsed: {0}")]
    MalformedPayload(String),
}

/// A provider-side active subscription, reduced to what the reconciler
/// needs (§4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionSnapshot {
    pub subscription_id: String,
    pub customer_id: String,
    pub price_id: String,
    pub status: String,
    pub current_period_end: DateTime<Utc>,
    pub cancel_at: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
    pub created: DateTime<Utc>,
}

/// A decoded, signature-verified webhook event.
#[derive(Debug, Clone)]
pub enum WebhookEvent {
    /// `customer.subscription.*` — carries the subscription directly.
    SubscriptionChanged {
        customer_id: String,
        subscription: SubscriptionSnapshot,
    },
    /// `subscription_schedule.*` — only references a subscription id; the
    /// reconciler must fetch it before acting.
    ScheduleChanged {
        customer_id: String,
        subscription_id: String,
    },
    /// Any event kind not relevant to subscription reconciliation.
    Ignored,
}

#[derive(Clone)]
pub struct PaymentProviderConfig {
    pub provider: String,
    pub api_key: String,
    pub webhook_secret: String,
}

impl std::fmt::Debug for PaymentProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentProviderConfig")
            .field("provider", &self.provider)
            .field("api_key", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .finish()
    }
}

impl PaymentProviderConfig {
    pub fn from_env() -> Result<Self, PaymentError> {
        let provider =
            std::env::var("PAYMENT_PROVIDER").unwrap_or_else(|_| "stripe".to_string());
        let api_key = std::env::var("PAYMENT_PROVIDER_KEY").unwrap_or_default();
        let webhook_secret =
            std::env::var("PAYMENT_PROVIDER_WEBHOOK_SECRET").unwrap_or_default();

        if provider != "mock" && api_key.is_empty() {
            return Err(PaymentError::Configuration(
                "PAYMENT_PROVIDER_KEY is required for the stripe provider".to_string(),
            ));
        }

        Ok(Self {
            provider,
            api_key,
            webhook_secret,
        })
    }
}

/// Payment-provider client trait for different implementations.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// List a customer's currently-active subscriptions, newest first.
    async fn list_active_subscriptions(
        &self,
        customer_id: &str,
    ) -> Result<Vec<SubscriptionSnapshot>, PaymentError>;

    /// Fetch a single subscription by id (used for `subscription_schedule.*`
    /// events, which only reference the subscription indirectly).
    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<SubscriptionSnapshot, PaymentError>;

    /// Cancel a subscription, prorating and invoicing immediately. Callers
    /// treat failures as best-effort per §4.4 step 4.
    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), PaymentError>;

    /// Verify a webhook payload's signature and decode it into a
    /// `WebhookEvent`. Unverifiable payloads are `InvalidSignature`.
    fn verify_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<WebhookEvent, PaymentError>;
}

pub struct PaymentProviderFactory;

impl PaymentProviderFactory {
    pub fn create(
        config: PaymentProviderConfig,
    ) -> Result<Box<dyn PaymentProvider>, PaymentError> {
        match config.provider.as_str() {
            "stripe" => {
                tracing::info!("creating stripe payment provider client");
                Ok(Box::new(stripe_client::StripePaymentProvider::new(
                    config,
                )?))
            }
            "mock" => {
                tracing::info!("creating mock payment provider");
                Ok(Box::new(mock::MockPaymentProvider::new()))
            }
            provider => Err(PaymentError::Configuration(format!(
                "unknown payment provider: {provider}. supported providers: stripe, mock"
            ))),
        }
    }
}
