//! The real payment-provider client, backed by `async-stripe`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use stripe::{
    Client, CustomerId, Event, EventObject, EventType, ListSubscriptions, Subscription,
    SubscriptionId, SubscriptionStatusFilter,
};

use crate::{PaymentError, PaymentProvider, PaymentProviderConfig, SubscriptionSnapshot, WebhookEvent};

pub struct StripePaymentProvider {
    client: Client,
    webhook_secret: String,
}

impl StripePaymentProvider {
    pub fn new(config: PaymentProviderConfig) -> Result<Self, PaymentError> {
        if config.api_key.is_empty() {
            return Err(PaymentError::Configuration(
                "PAYMENT_PROVIDER_KEY is required".to_string(),
            ));
        }
        Ok(Self {
            client: Client::new(config.api_key),
            webhook_secret: config.webhook_secret,
        })
    }
}

fn to_snapshot(sub: &Subscription) -> SubscriptionSnapshot {
    let price_id = sub
        .items
        .data
        .first()
        .and_then(|item| item.price.as_ref())
        .map(|p| p.id.to_string())
        .unwrap_or_default();

    SubscriptionSnapshot {
        subscription_id: sub.id.to_string(),
        customer_id: sub.customer.id().to_string(),
        price_id,
        status: sub.status.to_string(),
        current_period_end: DateTime::<Utc>::from_timestamp(sub.current_period_end, 0)
            .unwrap_or_else(Utc::now),
        cancel_at: sub
            .cancel_at
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)),
        cancel_at_period_end: sub.cancel_at_period_end,
        created: DateTime::<Utc>::from_timestamp(sub.created, 0).unwrap_or_else(Utc::now),
    }
}

#[async_trait]
impl PaymentProvider for StripePaymentProvider {
    async fn list_active_subscriptions(
        &self,
        customer_id: &str,
    ) -> Result<Vec<SubscriptionSnapshot>, PaymentError> {
        let customer_id: CustomerId = customer_id
            .parse()
            .map_err(|e| PaymentError::Request(format!("invalid customer id: {e}")))?;

        let mut params = ListSubscriptions::new();
        params.customer = Some(customer_id);
        params.status = Some(SubscriptionStatusFilter::Active);

        let subscriptions = Subscription::list(&self.client, &params)
            .await
            .map_err(|e| PaymentError::Request(e.to_string()))?;

        let mut snapshots: Vec<SubscriptionSnapshot> =
            subscriptions.data.iter().map(to_snapshot).collect();
        snapshots.sort_by(|a, b| b.created.cmp(&a.created));
        Ok(snapshots)
    }

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<SubscriptionSnapshot, PaymentError> {
        let id: SubscriptionId = subscription_id
            .parse()
            .map_err(|e| PaymentError::Request(format!("invalid subscription id: {e}")))?;
        let sub = Subscription::retrieve(&self.client, &id, &[])
            .await
            .map_err(|e| PaymentError::Request(e.to_string()))?;
        Ok(to_snapshot(&sub))
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), PaymentError> {
        let id: SubscriptionId = subscription_id
            .parse()
            .map_err(|e| PaymentError::Request(format!("invalid subscription id: {e}")))?;
        Subscription::cancel(&self.client, &id, Default::default())
            .await
            .map_err(|e| PaymentError::Request(e.to_string()))?;
        Ok(())
    }

    fn verify_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<WebhookEvent, PaymentError> {
        let payload_str = std::str::from_utf8(payload)
            .map_err(|e| PaymentError::MalformedPayload(e.to_string()))?;

        let event: Event = stripe::Webhook::construct_event(
            payload_str,
            signature_header,
            &self.webhook_secret,
        )
        .map_err(|e| PaymentError::InvalidSignature(e.to_string()))?;

        Ok(match (&event.type_, &event.data.object) {
            (
                EventType::CustomerSubscriptionCreated
                | EventType::CustomerSubscriptionUpdated
                | EventType::CustomerSubscriptionDeleted,
                EventObject::Subscription(sub),
            ) => WebhookEvent::SubscriptionChanged {
                customer_id: sub.customer.id().to_string(),
                subscription: to_snapshot(sub),
            },
            (
                EventType::SubscriptionScheduleCreated
                | EventType::SubscriptionScheduleUpdated
                | EventType::SubscriptionScheduleCanceled
                | EventType::SubscriptionScheduleCompleted
                | EventType::SubscriptionScheduleReleased,
                EventObject::SubscriptionSchedule(schedule),
            ) => {
                let Some(subscription_id) = schedule.subscription.as_ref().map(|s| s.id().to_string())
                else {
                    return Ok(WebhookEvent::Ignored);
                };
                WebhookEvent::ScheduleChanged {
                    customer_id: schedule.customer.id().to_string(),
                    subscription_id,
                }
            }
            _ => WebhookEvent::Ignored,
        })
    }
}
