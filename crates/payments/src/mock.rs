//! Mock payment provider for tests and local development.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Mutex;

use crate::{PaymentError, PaymentProvider, SubscriptionSnapshot, WebhookEvent};

/// Records cancellations and returns canned subscription data configured
/// via [`MockPaymentProvider::seed`].
pub struct MockPaymentProvider {
    subscriptions: Mutex<Vec<SubscriptionSnapshot>>,
    cancelled: Mutex<Vec<String>>,
}

impl Default for MockPaymentProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self {
            subscriptions: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
        }
    }

    pub fn seed(&self, subscription: SubscriptionSnapshot) {
        self.subscriptions.lock().unwrap().push(subscription);
    }

    pub fn cancelled_subscriptions(&self) -> Vec<String> {
        self.cancelled.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn list_active_subscriptions(
        &self,
        customer_id: &str,
    ) -> Result<Vec<SubscriptionSnapshot>, PaymentError> {
        let mut matches: Vec<SubscriptionSnapshot> = self
            .subscriptions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.customer_id == customer_id && s.status == "active")
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created.cmp(&a.created));
        Ok(matches)
    }

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<SubscriptionSnapshot, PaymentError> {
        self.subscriptions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.subscription_id == subscription_id)
            .cloned()
            .ok_or_else(|| PaymentError::Request(format!("unknown subscription {subscription_id}")))
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), PaymentError> {
        self.cancelled.lock().unwrap().push(subscription_id.to_string());
        if let Some(sub) = self
            .subscriptions
            .lock()
            .unwrap()
            .iter_mut()
            .find(|s| s.subscription_id == subscription_id)
        {
            sub.status = "canceled".to_string();
        }
        Ok(())
    }

    fn verify_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<WebhookEvent, PaymentError> {
        if signature_header != "mock-valid-signature" {
            return Err(PaymentError::InvalidSignature(
                "mock signature mismatch".to_string(),
            ));
        }
        let value: serde_json::Value = serde_json::from_slice(payload)
            .map_err(|e| PaymentError::MalformedPayload(e.to_string()))?;

        match value.get("kind").and_then(|v| v.as_str()) {
            Some("subscription_changed") => {
                let customer_id = value["customer_id"].as_str().unwrap_or_default().to_string();
                let subscription = SubscriptionSnapshot {
                    subscription_id: value["subscription_id"].as_str().unwrap_or_default().into(),
                    customer_id: customer_id.clone(),
                    price_id: value["price_id"].as_str().unwrap_or_default().into(),
                    status: value["status"].as_str().unwrap_or("active").into(),
                    current_period_end: Utc::now(),
                    cancel_at: None,
                    cancel_at_period_end: false,
                    created: Utc::now(),
                };
                Ok(WebhookEvent::SubscriptionChanged {
                    customer_id,
                    subscription,
                })
            }
            Some("schedule_changed") => Ok(WebhookEvent::ScheduleChanged {
                customer_id: value["customer_id"].as_str().unwrap_or_default().into(),
                subscription_id: value["subscription_id"].as_str().unwrap_or_default().into(),
            }),
            _ => Ok(WebhookEvent::Ignored),
        }
    }
}
