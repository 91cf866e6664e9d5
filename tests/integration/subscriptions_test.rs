//! §8 scenario 5: a Stripe webhook reconciles the affected customer's
//! subscription, updates tier/subscription fields, and best-effort
//! cancels every other active subscription on that customer.

mod common;

use axum::body::Body;
use axum::http::Request;
use chrono::Utc;
use serde_json::json;

use common::{bearer_header, sign_test_token, TestApp};
use meridian_payments::SubscriptionSnapshot;

async fn bind_customer(app: &TestApp, name: &'static str, value: &str, customer_id: &str) {
    let (status, _) = app
        .request(
            Request::builder()
                .method("PUT")
                .uri("/user")
                .header(name, value)
                .header("content-type", "application/json")
                .body(Body::from(json!({"customerId": customer_id}).to_string()))
                .unwrap(),
        )
        .await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn subscription_changed_webhook_promotes_the_customers_tier() {
    let app = TestApp::new("http://unused.invalid").await.expect("build test app");
    let token = sign_test_token("sub-webhook-promote", None);
    let (name, value) = bearer_header(&token);
    bind_customer(&app, name, &value, "cus_promote_1").await;

    // `reconcile_customer` re-lists active subscriptions from the
    // provider rather than trusting the webhook payload's own snapshot,
    // so the tier change comes from what's seeded here, not the JSON body.
    app.payments.seed(SubscriptionSnapshot {
        subscription_id: "sub_1".into(),
        customer_id: "cus_promote_1".into(),
        price_id: "price_premium_20".into(),
        status: "active".into(),
        current_period_end: Utc::now(),
        cancel_at: None,
        cancel_at_period_end: false,
        created: Utc::now(),
    });

    let (status, _) = app
        .request(
            Request::builder()
                .method("POST")
                .uri("/stripe/webhook")
                .header("stripe-signature", "mock-valid-signature")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "kind": "subscription_changed",
                        "customer_id": "cus_promote_1",
                        "subscription_id": "sub_1",
                        "price_id": "price_premium_20",
                        "status": "active"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await;
    assert_eq!(status, 204);

    let (status, me) = app
        .request(Request::builder().uri("/user").header(name, value).body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, 200);
    assert_eq!(me["tier"], 3); // Premium20
    assert_eq!(me["subscription_status"], "active");

    app.cleanup().await;
}

#[tokio::test]
async fn reconcile_cancels_every_other_active_subscription_on_the_customer() {
    let app = TestApp::new("http://unused.invalid").await.expect("build test app");
    let token = sign_test_token("sub-webhook-cancel-others", None);
    let (name, value) = bearer_header(&token);
    bind_customer(&app, name, &value, "cus_multi_1").await;

    // Two active subscriptions already on file for this customer; the
    // reconciler keeps the newest by `created` and cancels the rest.
    app.payments.seed(SubscriptionSnapshot {
        subscription_id: "sub_old".into(),
        customer_id: "cus_multi_1".into(),
        price_id: "price_premium_5".into(),
        status: "active".into(),
        current_period_end: Utc::now(),
        cancel_at: None,
        cancel_at_period_end: false,
        created: Utc::now() - chrono::Duration::days(10),
    });
    app.payments.seed(SubscriptionSnapshot {
        subscription_id: "sub_new".into(),
        customer_id: "cus_multi_1".into(),
        price_id: "price_premium_80".into(),
        status: "active".into(),
        current_period_end: Utc::now(),
        cancel_at: None,
        cancel_at_period_end: false,
        created: Utc::now(),
    });

    let (status, _) = app
        .request(
            Request::builder()
                .method("POST")
                .uri("/stripe/webhook")
                .header("stripe-signature", "mock-valid-signature")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "kind": "subscription_changed",
                        "customer_id": "cus_multi_1",
                        "subscription_id": "sub_new",
                        "price_id": "price_premium_80",
                        "status": "active"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await;
    assert_eq!(status, 204);

    assert_eq!(app.payments.cancelled_subscriptions(), vec!["sub_old".to_string()]);

    let (_, me) = app
        .request(Request::builder().uri("/user").header(name, value).body(Body::empty()).unwrap())
        .await;
    assert_eq!(me["tier"], 4); // Premium80 — the webhook's own subscription wins

    app.cleanup().await;
}

#[tokio::test]
async fn schedule_changed_webhook_fetches_the_referenced_subscription_first() {
    let app = TestApp::new("http://unused.invalid").await.expect("build test app");
    let token = sign_test_token("sub-webhook-schedule", None);
    let (name, value) = bearer_header(&token);
    bind_customer(&app, name, &value, "cus_schedule_1").await;

    app.payments.seed(SubscriptionSnapshot {
        subscription_id: "sub_sched_1".into(),
        customer_id: "cus_schedule_1".into(),
        price_id: "price_premium_5".into(),
        status: "active".into(),
        current_period_end: Utc::now(),
        cancel_at: None,
        cancel_at_period_end: false,
        created: Utc::now(),
    });

    let (status, _) = app
        .request(
            Request::builder()
                .method("POST")
                .uri("/stripe/webhook")
                .header("stripe-signature", "mock-valid-signature")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "kind": "schedule_changed",
                        "customer_id": "cus_schedule_1",
                        "subscription_id": "sub_sched_1"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await;
    assert_eq!(status, 204);

    let (_, me) = app
        .request(Request::builder().uri("/user").header(name, value).body(Body::empty()).unwrap())
        .await;
    assert_eq!(me["tier"], 2); // Premium5

    app.cleanup().await;
}

#[tokio::test]
async fn webhook_with_wrong_signature_is_rejected() {
    let app = TestApp::new("http://unused.invalid").await.expect("build test app");

    let (status, body) = app
        .request(
            Request::builder()
                .method("POST")
                .uri("/stripe/webhook")
                .header("stripe-signature", "totally-wrong")
                .header("content-type", "application/json")
                .body(Body::from(json!({"kind": "subscription_changed"}).to_string()))
                .unwrap(),
        )
        .await;
    assert_eq!(status, 400);
    assert!(body["message"].as_str().is_some());

    app.cleanup().await;
}

#[tokio::test]
async fn unknown_customer_webhook_is_rejected() {
    let app = TestApp::new("http://unused.invalid").await.expect("build test app");

    let (status, _) = app
        .request(
            Request::builder()
                .method("POST")
                .uri("/stripe/webhook")
                .header("stripe-signature", "mock-valid-signature")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "kind": "subscription_changed",
                        "customer_id": "cus_never_bound",
                        "subscription_id": "sub_x",
                        "price_id": "price_premium_5",
                        "status": "active"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await;
    assert_eq!(status, 404);

    app.cleanup().await;
}

#[tokio::test]
async fn checkout_rejects_unknown_price_ids_before_delegating() {
    let app = TestApp::new("http://unused.invalid").await.expect("build test app");
    let token = sign_test_token("sub-checkout", None);
    let (name, value) = bearer_header(&token);

    let (status, body) = app
        .request(
            Request::builder()
                .method("POST")
                .uri("/stripe/checkout")
                .header(name, value)
                .header("content-type", "application/json")
                .body(Body::from(json!({"priceId": "not-a-real-price"}).to_string()))
                .unwrap(),
        )
        .await;
    assert_eq!(status, 400);
    assert!(body["message"].as_str().unwrap().contains("unknown price id"));

    app.cleanup().await;
}

#[tokio::test]
async fn list_prices_echoes_the_portals_own_catalog() {
    let app = TestApp::new("http://unused.invalid").await.expect("build test app");

    let (status, body) = app
        .request(Request::builder().uri("/stripe/prices").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, 200);
    let listings = body.as_array().unwrap();
    assert_eq!(listings.len(), 3);
    assert!(listings.iter().any(|p| p["priceId"] == "price_premium_5" && p["tier"] == 2));

    app.cleanup().await;
}
