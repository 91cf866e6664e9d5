//! §8 scenario 3: a zero-size upload enqueues a metadata fetch against
//! the storage backend, which backfills the skylink's size/filename and
//! any zero-byte download rows recorded against it in the meantime.

mod common;

use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{fingerprint, TestApp};

async fn poll_until_skylink_sized(app: &TestApp, fp: &str) -> (Option<i64>, Option<String>) {
    for _ in 0..40 {
        let row: (Option<i64>, Option<String>) =
            sqlx::query_as("SELECT size, filename FROM skylinks WHERE fingerprint = $1")
                .bind(fp)
                .fetch_one(&app.pool)
                .await
                .unwrap();
        if row.0.map(|s| s > 0).unwrap_or(false) {
            return row;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("skylink size was never backfilled");
}

#[tokio::test]
async fn zero_size_upload_triggers_metadata_fetch_and_backfills_size() {
    let mock_server = MockServer::start().await;
    let fp = fingerprint("fetcher-backfill");

    Mock::given(method("HEAD"))
        .and(path(format!("/skynet/skylink/{fp}")))
        .respond_with(
            ResponseTemplate::new(200).insert_header(
                "skynet-skylink-metadata",
                json!({"filename": "notes.txt", "length": 2048}).to_string(),
            ),
        )
        .mount(&mock_server)
        .await;

    let app = TestApp::new(&mock_server.uri()).await.expect("build test app");

    let (status, _) = app
        .request(
            Request::builder()
                .method("POST")
                .uri(format!("/track/upload/{fp}"))
                .header("content-type", "application/json")
                .body(Body::from(json!({"bytes": 0}).to_string()))
                .unwrap(),
        )
        .await;
    assert_eq!(status, 204);

    let (size, filename) = poll_until_skylink_sized(&app, &fp).await;
    assert_eq!(size, Some(2048));
    assert_eq!(filename.as_deref(), Some("notes.txt"));

    app.cleanup().await;
}

#[tokio::test]
async fn backfill_updates_pending_zero_byte_download_rows() {
    let mock_server = MockServer::start().await;
    let fp = fingerprint("fetcher-download-backfill");

    Mock::given(method("HEAD"))
        .and(path(format!("/skynet/skylink/{fp}")))
        .respond_with(
            ResponseTemplate::new(200).insert_header(
                "skynet-skylink-metadata",
                json!({"filename": "video.mp4", "length": 999_999}).to_string(),
            ),
        )
        .mount(&mock_server)
        .await;

    let app = TestApp::new(&mock_server.uri()).await.expect("build test app");

    // A zero-size skylink already exists, with a download already recorded
    // against it before its real size was ever learned.
    let skylink_id = app.seed_skylink(&fp, 0).await;
    sqlx::query(
        "INSERT INTO downloads (id, user_id, skylink_id, client_ip, bytes, created_at) VALUES ($1, NULL, $2, NULL, 0, NOW())",
    )
    .bind(uuid::Uuid::new_v4())
    .bind(skylink_id)
    .execute(&app.pool)
    .await
    .unwrap();

    let (status, _) = app
        .request(
            Request::builder()
                .method("POST")
                .uri(format!("/track/upload/{fp}"))
                .header("content-type", "application/json")
                .body(Body::from(json!({"bytes": 0}).to_string()))
                .unwrap(),
        )
        .await;
    assert_eq!(status, 204);

    poll_until_skylink_sized(&app, &fp).await;

    let bytes: i64 = sqlx::query_scalar("SELECT bytes FROM downloads WHERE skylink_id = $1")
        .bind(skylink_id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(bytes, 999_999);

    app.cleanup().await;
}
