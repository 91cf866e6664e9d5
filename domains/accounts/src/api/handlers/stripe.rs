//! `POST /stripe/webhook`, `GET /stripe/prices`, `POST
//! /stripe/{billing,checkout}`, per §6.
//!
//! The subscription-plan catalog and checkout/billing-portal session
//! creation are external-collaborator responsibilities (§1's Non-goals);
//! only the webhook-driven reconciliation belongs to the core.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Serialize;

use meridian_auth::AuthUser;
use meridian_common::Error as CommonError;

use crate::api::error::ApiError;
use crate::api::middleware::AccountsState;
use crate::domain::subscriptions::{handle_webhook_event, tier_for_price_id};
use crate::domain::quota;

const SIGNATURE_HEADER: &str = "stripe-signature";

/// `POST /stripe/webhook` — verifies the signature, decodes the event,
/// and reconciles the affected customer's subscription state (§4.4).
pub async fn webhook(
    State(state): State<AccountsState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Common(CommonError::BadRequest("missing signature header".to_string())))?;

    let event = state.payments.verify_webhook(&body, signature).map_err(ApiError::Payment)?;
    handle_webhook_event(state.repos.pool(), &state.tier_cache, state.payments.as_ref(), event).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct PriceListing {
    #[serde(rename = "priceId")]
    price_id: &'static str,
    tier: meridian_auth::Tier,
    #[serde(rename = "storageBudgetBytes")]
    storage_budget_bytes: i64,
}

/// `GET /stripe/prices` — the portal's own tier/price-id catalog, not a
/// live call to the payment provider (the catalog itself is out of
/// scope, per §1; this just echoes the mapping the reconciler applies).
pub async fn list_prices() -> Json<Vec<PriceListing>> {
    let listings = [
        ("price_premium_5", meridian_auth::Tier::Premium5),
        ("price_premium_20", meridian_auth::Tier::Premium20),
        ("price_premium_80", meridian_auth::Tier::Premium80),
    ]
    .into_iter()
    .map(|(price_id, tier)| PriceListing {
        price_id,
        tier,
        storage_budget_bytes: quota::limits_for(tier).storage_budget_bytes,
    })
    .collect();
    Json(listings)
}

#[derive(Debug, serde::Deserialize)]
pub struct CheckoutRequest {
    #[serde(rename = "priceId")]
    price_id: String,
}

/// `POST /stripe/checkout` — out of scope per §1: session creation is
/// the payment provider's own hosted flow, not something this service
/// mediates. Validates the requested price id locally and otherwise
/// defers to the external collaborator.
pub async fn checkout(
    AuthUser(_user, _): AuthUser,
    Json(body): Json<CheckoutRequest>,
) -> Result<StatusCode, ApiError> {
    if tier_for_price_id(&body.price_id).is_none() {
        return Err(ApiError::Common(CommonError::BadRequest(format!(
            "unknown price id: {}",
            body.price_id
        ))));
    }
    Err(ApiError::Common(CommonError::DependencyFailed(
        "checkout session creation is handled by the payment provider directly".to_string(),
    )))
}

/// `POST /stripe/billing` — out of scope per §1 for the same reason as
/// `checkout`: the billing portal is the payment provider's own surface.
pub async fn billing_portal(AuthUser(_user, _): AuthUser) -> Result<StatusCode, ApiError> {
    Err(ApiError::Common(CommonError::DependencyFailed(
        "billing portal session creation is handled by the payment provider directly".to_string(),
    )))
}
