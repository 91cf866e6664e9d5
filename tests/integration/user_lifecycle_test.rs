//! §8 scenario 1: first-sight JIT provisioning, the one-shot
//! payment-customer bind, and cascade deletion.

mod common;

use axum::body::Body;
use axum::http::Request;
use serde_json::json;

use common::{bearer_header, sign_test_token, TestApp};

#[tokio::test]
async fn first_sighting_provisions_a_free_tier_user() {
    let app = TestApp::new("http://unused.invalid").await.expect("build test app");
    let token = sign_test_token("sub-first-sight-1", Some("new@meridian-test.portal"));
    let (name, value) = bearer_header(&token);

    let (status, body) = app
        .request(
            Request::builder()
                .method("GET")
                .uri("/user")
                .header(name, value)
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(status, 200);
    assert_eq!(body["sub"], "sub-first-sight-1");
    assert_eq!(body["tier"], 1); // Free
    assert_eq!(body["quota_exceeded"], false);
    assert_eq!(body["email"], "new@meridian-test.portal");

    app.cleanup().await;
}

#[tokio::test]
async fn same_sub_is_not_reprovisioned_on_second_request() {
    let app = TestApp::new("http://unused.invalid").await.expect("build test app");
    let token = sign_test_token("sub-first-sight-2", None);
    let (name, value) = bearer_header(&token);

    let (status1, body1) = app
        .request(
            Request::builder()
                .uri("/user")
                .header(name.clone(), value.clone())
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    let (status2, body2) = app
        .request(Request::builder().uri("/user").header(name, value).body(Body::empty()).unwrap())
        .await;

    assert_eq!(status1, 200);
    assert_eq!(status2, 200);
    assert_eq!(body1["id"], body2["id"]);

    app.cleanup().await;
}

#[tokio::test]
async fn customer_id_bind_is_one_shot() {
    let app = TestApp::new("http://unused.invalid").await.expect("build test app");
    let token = sign_test_token("sub-bind-customer", None);
    let (name, value) = bearer_header(&token);

    let (status, body) = app
        .request(
            Request::builder()
                .method("PUT")
                .uri("/user")
                .header(name.clone(), value.clone())
                .header("content-type", "application/json")
                .body(Body::from(json!({"customerId": "cus_abc123"}).to_string()))
                .unwrap(),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["payment_customer_id"], "cus_abc123");

    let (status2, body2) = app
        .request(
            Request::builder()
                .method("PUT")
                .uri("/user")
                .header(name, value)
                .header("content-type", "application/json")
                .body(Body::from(json!({"customerId": "cus_different"}).to_string()))
                .unwrap(),
        )
        .await;
    assert_eq!(status2, 422);
    assert!(body2["message"].as_str().unwrap().contains("already set"));

    app.cleanup().await;
}

#[tokio::test]
async fn deleting_a_user_cascades_owned_rows() {
    let app = TestApp::new("http://unused.invalid").await.expect("build test app");
    let token = sign_test_token("sub-delete-cascade", None);
    let (name, value) = bearer_header(&token);

    let (_, body) = app
        .request(Request::builder().uri("/user").header(name.clone(), value.clone()).body(Body::empty()).unwrap())
        .await;
    let user_id = body["id"].as_str().unwrap().to_string();

    let fp = common::fingerprint("delete-cascade-upload");
    let skylink_id = app.seed_skylink(&fp, 1024).await;
    app.seed_upload(uuid::Uuid::parse_str(&user_id).unwrap(), skylink_id).await;

    let (status, _) = app
        .request(
            Request::builder()
                .method("DELETE")
                .uri("/user")
                .header(name.clone(), value.clone())
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, 204);

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM uploads WHERE user_id = $1")
        .bind(uuid::Uuid::parse_str(&user_id).unwrap())
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(remaining, 0);

    // The token's `sub` is gone, so the next request re-provisions a new user.
    let (status2, body2) = app
        .request(Request::builder().uri("/user").header(name, value).body(Body::empty()).unwrap())
        .await;
    assert_eq!(status2, 200);
    assert_ne!(body2["id"], user_id);

    app.cleanup().await;
}
