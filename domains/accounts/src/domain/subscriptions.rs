//! The subscription reconciler, per §4.4.
//!
//! Belongs to the core (per §1) because it drives tier changes and cache
//! invalidation, even though the payment provider itself is an external
//! collaborator (`meridian-payments`).

use meridian_auth::Tier;
use meridian_payments::{PaymentError, PaymentProvider, SubscriptionSnapshot, WebhookEvent};
use sqlx::PgPool;

use crate::domain::tier_cache::TierCache;

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("no user found for payment-provider customer id {0}")]
    UnknownCustomer(String),
    #[error("payment provider error: {0}")]
    Provider(#[from] PaymentError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Maps a provider price id to a tier. Versioned so catalog changes don't
/// require touching call sites — the catalog itself is out of scope
/// (§1), but the mapping the reconciler applies to an incoming snapshot
/// is part of the core.
pub fn tier_for_price_id(price_id: &str) -> Option<Tier> {
    match price_id {
        "price_premium_5" => Some(Tier::Premium5),
        "price_premium_20" => Some(Tier::Premium20),
        "price_premium_80" => Some(Tier::Premium80),
        _ => None,
    }
}

/// Run the full reconciliation procedure of §4.4 for one customer.
pub async fn reconcile_customer(
    pool: &PgPool,
    cache: &TierCache,
    provider: &dyn PaymentProvider,
    customer_id: &str,
) -> Result<(), ReconcileError> {
    let user_id: Option<uuid::Uuid> =
        sqlx::query_scalar("SELECT id FROM users WHERE payment_customer_id = $1")
            .bind(customer_id)
            .fetch_optional(pool)
            .await?;
    let user_id = user_id.ok_or_else(|| ReconcileError::UnknownCustomer(customer_id.to_string()))?;

    let mut subscriptions = provider.list_active_subscriptions(customer_id).await?;
    subscriptions.sort_by(|a, b| b.created.cmp(&a.created));

    match subscriptions.first() {
        None => reset_to_free(pool, user_id).await?,
        Some(selected) => {
            apply_subscription(pool, user_id, selected).await?;
            cancel_other_subscriptions(provider, &subscriptions[1..]).await;
        }
    }

    cache.invalidate_user(user_id);
    Ok(())
}

async fn reset_to_free(pool: &PgPool, user_id: uuid::Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE users SET
            tier = $1,
            subscription_status = NULL,
            subscribed_until = NULL,
            subscription_cancel_at = NULL,
            cancel_at_period_end = false,
            updated_at = NOW()
        WHERE id = $2
        "#,
    )
    .bind(Tier::Free)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(())
}

async fn apply_subscription(
    pool: &PgPool,
    user_id: uuid::Uuid,
    subscription: &SubscriptionSnapshot,
) -> Result<(), ReconcileError> {
    let tier = tier_for_price_id(&subscription.price_id).unwrap_or(Tier::Free);

    sqlx::query(
        r#"
        UPDATE users SET
            tier = $1,
            subscription_status = $2,
            subscribed_until = $3,
            subscription_cancel_at = $4,
            cancel_at_period_end = $5,
            updated_at = NOW()
        WHERE id = $6
        "#,
    )
    .bind(tier)
    .bind(&subscription.status)
    .bind(subscription.current_period_end)
    .bind(subscription.cancel_at)
    .bind(subscription.cancel_at_period_end)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Best-effort: cancel every subscription but the one just applied.
/// Failures are logged, not fatal, per §4.4 step 4.
async fn cancel_other_subscriptions(provider: &dyn PaymentProvider, stale: &[SubscriptionSnapshot]) {
    for subscription in stale {
        if let Err(err) = provider.cancel_subscription(&subscription.subscription_id).await {
            tracing::warn!(
                subscription_id = %subscription.subscription_id,
                error = %err,
                "failed to cancel stale subscription (best-effort)"
            );
        }
    }
}

/// Dispatch a verified webhook event, per §4.4: `customer.subscription.*`
/// carries the subscription directly; `subscription_schedule.*` only
/// references it, so the referenced subscription is fetched first.
pub async fn handle_webhook_event(
    pool: &PgPool,
    cache: &TierCache,
    provider: &dyn PaymentProvider,
    event: WebhookEvent,
) -> Result<(), ReconcileError> {
    match event {
        WebhookEvent::SubscriptionChanged { customer_id, .. } => {
            reconcile_customer(pool, cache, provider, &customer_id).await
        }
        WebhookEvent::ScheduleChanged {
            customer_id,
            subscription_id,
        } => {
            // Fetching isn't strictly necessary for reconcile_customer
            // (which re-lists from the provider), but per §4.4 this event
            // kind is "indirect" — fetch it first so a provider-side 404
            // surfaces before any local mutation is attempted.
            provider.get_subscription(&subscription_id).await?;
            reconcile_customer(pool, cache, provider, &customer_id).await
        }
        WebhookEvent::Ignored => Ok(()),
    }
}
