//! `POST /track/{upload,download}/:skylink` and `POST
//! /track/registry/{read,write}`: negative-size rejection, zero-byte
//! download suppression, and anonymous-vs-attributed attribution.

mod common;

use axum::body::Body;
use axum::http::Request;
use serde_json::json;
use uuid::Uuid;

use common::{bearer_header, fingerprint, sign_test_token, TestApp};

#[tokio::test]
async fn negative_upload_bytes_is_rejected() {
    let app = TestApp::new("http://unused.invalid").await.expect("build test app");
    let fp = fingerprint("track-negative-upload");

    let (status, body) = app
        .request(
            Request::builder()
                .method("POST")
                .uri(format!("/track/upload/{fp}"))
                .header("content-type", "application/json")
                .body(Body::from(json!({"bytes": -1}).to_string()))
                .unwrap(),
        )
        .await;

    assert_eq!(status, 400);
    assert!(body["message"].as_str().unwrap().contains("negative"));

    app.cleanup().await;
}

#[tokio::test]
async fn negative_download_bytes_is_rejected() {
    let app = TestApp::new("http://unused.invalid").await.expect("build test app");
    let fp = fingerprint("track-negative-download");
    app.seed_skylink(&fp, 1024).await;

    let (status, body) = app
        .request(
            Request::builder()
                .method("POST")
                .uri(format!("/track/download/{fp}"))
                .header("content-type", "application/json")
                .body(Body::from(json!({"bytes": -1}).to_string()))
                .unwrap(),
        )
        .await;

    assert_eq!(status, 400);
    assert!(body["message"].as_str().unwrap().contains("negative"));

    app.cleanup().await;
}

#[tokio::test]
async fn zero_byte_download_is_silently_ignored() {
    let app = TestApp::new("http://unused.invalid").await.expect("build test app");
    // No skylink seeded at all — a zero-byte report must short-circuit
    // before the handler ever looks the skylink up.
    let fp = fingerprint("track-zero-download-unknown");

    let (status, _) = app
        .request(
            Request::builder()
                .method("POST")
                .uri(format!("/track/download/{fp}"))
                .header("content-type", "application/json")
                .body(Body::from(json!({"bytes": 0}).to_string()))
                .unwrap(),
        )
        .await;

    assert_eq!(status, 204);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM downloads")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(count, 0);

    app.cleanup().await;
}

#[tokio::test]
async fn anonymous_upload_is_recorded_with_no_user() {
    let app = TestApp::new("http://unused.invalid").await.expect("build test app");
    let fp = fingerprint("track-anon-upload");

    let (status, _) = app
        .request(
            Request::builder()
                .method("POST")
                .uri(format!("/track/upload/{fp}"))
                .header("content-type", "application/json")
                .body(Body::from(json!({"bytes": 2048}).to_string()))
                .unwrap(),
        )
        .await;
    assert_eq!(status, 204);

    let user_id: Option<Uuid> =
        sqlx::query_scalar("SELECT u.user_id FROM uploads u JOIN skylinks s ON s.id = u.skylink_id WHERE s.fingerprint = $1")
            .bind(&fp)
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert!(user_id.is_none());

    app.cleanup().await;
}

#[tokio::test]
async fn attributed_upload_is_recorded_against_the_caller() {
    let app = TestApp::new("http://unused.invalid").await.expect("build test app");
    let token = sign_test_token("sub-track-attributed", None);
    let (name, value) = bearer_header(&token);
    let fp = fingerprint("track-attributed-upload");

    let (_, me) = app
        .request(Request::builder().uri("/user").header(name.clone(), value.clone()).body(Body::empty()).unwrap())
        .await;
    let expected_user_id = Uuid::parse_str(me["id"].as_str().unwrap()).unwrap();

    let (status, _) = app
        .request(
            Request::builder()
                .method("POST")
                .uri(format!("/track/upload/{fp}"))
                .header(name, value)
                .header("content-type", "application/json")
                .body(Body::from(json!({"bytes": 4096}).to_string()))
                .unwrap(),
        )
        .await;
    assert_eq!(status, 204);

    let user_id: Option<Uuid> =
        sqlx::query_scalar("SELECT u.user_id FROM uploads u JOIN skylinks s ON s.id = u.skylink_id WHERE s.fingerprint = $1")
            .bind(&fp)
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert_eq!(user_id, Some(expected_user_id));

    app.cleanup().await;
}

#[tokio::test]
async fn registry_read_and_write_events_are_recorded() {
    let app = TestApp::new("http://unused.invalid").await.expect("build test app");

    let (status_read, _) = app
        .request(Request::builder().method("POST").uri("/track/registry/read").body(Body::empty()).unwrap())
        .await;
    let (status_write, _) = app
        .request(Request::builder().method("POST").uri("/track/registry/write").body(Body::empty()).unwrap())
        .await;

    assert_eq!(status_read, 204);
    assert_eq!(status_write, 204);

    let reads: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM registry_reads").fetch_one(&app.pool).await.unwrap();
    let writes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM registry_writes").fetch_one(&app.pool).await.unwrap();
    assert_eq!(reads, 1);
    assert_eq!(writes, 1);

    app.cleanup().await;
}
