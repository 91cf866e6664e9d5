//! §8 scenario 2: the over-quota transition, its reversal on unpin, and
//! the raw-storage formula end to end via `/user/stats`.

mod common;

use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use uuid::Uuid;

use common::{bearer_header, fingerprint, sign_test_token, TestApp};

/// A single upload this size pushes a Free-tier user's raw storage over
/// its 1 GiB budget on its own (40 MiB chunking + 3x redundancy beyond
/// the base sector), avoiding dozens of seeded uploads just to cross the
/// line.
const OVER_BUDGET_UPLOAD_SIZE: i64 = 400 * 1024 * 1024;

async fn poll_until<F>(app: &TestApp, name: &str, value: &str, mut check: F)
where
    F: FnMut(&serde_json::Value) -> bool,
{
    for _ in 0..40 {
        let (status, body) = app
            .request(
                Request::builder()
                    .uri("/user")
                    .header(name, value)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(status, 200);
        if check(&body) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("condition never became true within the polling window");
}

#[tokio::test]
async fn exceeding_storage_budget_flips_quota_exceeded() {
    let app = TestApp::new("http://unused.invalid").await.expect("build test app");
    let token = sign_test_token("sub-quota-over", None);
    let (name, value) = bearer_header(&token);

    let (_, body) = app
        .request(Request::builder().uri("/user").header(name.clone(), value.clone()).body(Body::empty()).unwrap())
        .await;
    let user_id = Uuid::parse_str(body["id"].as_str().unwrap()).unwrap();

    let fp = fingerprint("quota-over-upload");
    let skylink_id = app.seed_skylink(&fp, OVER_BUDGET_UPLOAD_SIZE).await;
    app.seed_upload(user_id, skylink_id).await;

    // A cheap tracked event is enough to trigger the off-request-path
    // quota re-evaluation; it doesn't add any storage of its own.
    let (status, _) = app
        .request(
            Request::builder()
                .method("POST")
                .uri("/track/registry/read")
                .header(name.clone(), value.clone())
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, 204);

    poll_until(&app, name, &value, |body| body["quota_exceeded"] == true).await;

    let (status, stats) = app
        .request(
            Request::builder()
                .uri("/user/stats")
                .header(name.clone(), value.clone())
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(stats["num_active_uploads"], 1);
    assert!(stats["total_raw_storage"].as_i64().unwrap() > 1024 * 1024 * 1024);

    // Over quota demotes the effective tier to anonymous (quota_exceeded
    // => effectiveTier = anonymous); `/user` itself always reports the
    // subscribed tier, but `/user/limits`'s fast path must reflect the
    // demotion.
    let (_, limits) = app
        .request(
            Request::builder()
                .uri("/user/limits")
                .header(name.clone(), value.clone())
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(limits["tier"], 0); // Anonymous

    app.cleanup().await;
}

#[tokio::test]
async fn unpinning_the_offending_upload_clears_quota_exceeded() {
    let app = TestApp::new("http://unused.invalid").await.expect("build test app");
    let token = sign_test_token("sub-quota-unpin", None);
    let (name, value) = bearer_header(&token);

    let (_, body) = app
        .request(Request::builder().uri("/user").header(name.clone(), value.clone()).body(Body::empty()).unwrap())
        .await;
    let user_id = Uuid::parse_str(body["id"].as_str().unwrap()).unwrap();

    let fp = fingerprint("quota-unpin-upload");
    let skylink_id = app.seed_skylink(&fp, OVER_BUDGET_UPLOAD_SIZE).await;
    app.seed_upload(user_id, skylink_id).await;

    app.request(
        Request::builder()
            .method("POST")
            .uri("/track/registry/read")
            .header(name.clone(), value.clone())
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    poll_until(&app, name, &value, |body| body["quota_exceeded"] == true).await;

    let (status, _) = app
        .request(
            Request::builder()
                .method("DELETE")
                .uri(format!("/user/uploads/{fp}"))
                .header(name.clone(), value.clone())
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, 204);

    poll_until(&app, name, &value, |body| body["quota_exceeded"] == false).await;

    app.cleanup().await;
}

#[tokio::test]
async fn within_budget_never_trips_quota_exceeded() {
    let app = TestApp::new("http://unused.invalid").await.expect("build test app");
    let token = sign_test_token("sub-quota-within", None);
    let (name, value) = bearer_header(&token);

    let (_, body) = app
        .request(Request::builder().uri("/user").header(name.clone(), value.clone()).body(Body::empty()).unwrap())
        .await;
    let user_id = Uuid::parse_str(body["id"].as_str().unwrap()).unwrap();

    let fp = fingerprint("quota-within-upload");
    let skylink_id = app.seed_skylink(&fp, 1024 * 1024).await;
    app.seed_upload(user_id, skylink_id).await;

    let (status, _) = app
        .request(
            Request::builder()
                .method("POST")
                .uri("/track/registry/read")
                .header(name.clone(), value.clone())
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, 204);

    tokio::time::sleep(Duration::from_millis(200)).await;

    let (status, body) = app
        .request(Request::builder().uri("/user").header(name, value).body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["quota_exceeded"], false);

    app.cleanup().await;
}
