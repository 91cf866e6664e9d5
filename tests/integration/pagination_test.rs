//! `offset`/`pageSize` validation shared by `GET /user/uploads` and
//! `GET /user/downloads`, per §6 Pagination.

mod common;

use axum::body::Body;
use axum::http::Request;
use uuid::Uuid;

use common::{bearer_header, fingerprint, sign_test_token, TestApp};

async fn seed_five_uploads(app: &TestApp, user_id: Uuid) {
    for i in 0..5 {
        let fp = fingerprint(&format!("pagination-upload-{i}"));
        let skylink_id = app.seed_skylink(&fp, 1024).await;
        app.seed_upload(user_id, skylink_id).await;
    }
}

#[tokio::test]
async fn negative_offset_is_rejected_on_uploads() {
    let app = TestApp::new("http://unused.invalid").await.expect("build test app");
    let token = sign_test_token("sub-pagination-offset", None);
    let (name, value) = bearer_header(&token);

    let (status, body) = app
        .request(
            Request::builder()
                .uri("/user/uploads?offset=-1")
                .header(name, value)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, 400);
    assert!(body["message"].as_str().unwrap().contains("offset"));

    app.cleanup().await;
}

#[tokio::test]
async fn negative_page_size_is_rejected_on_downloads() {
    let app = TestApp::new("http://unused.invalid").await.expect("build test app");
    let token = sign_test_token("sub-pagination-pagesize", None);
    let (name, value) = bearer_header(&token);

    let (status, body) = app
        .request(
            Request::builder()
                .uri("/user/downloads?pageSize=-5")
                .header(name, value)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, 400);
    assert!(body["message"].as_str().unwrap().contains("pageSize"));

    app.cleanup().await;
}

#[tokio::test]
async fn zero_page_size_falls_back_to_the_default() {
    let app = TestApp::new("http://unused.invalid").await.expect("build test app");
    let token = sign_test_token("sub-pagination-default", None);
    let (name, value) = bearer_header(&token);

    let (_, me) = app
        .request(Request::builder().uri("/user").header(name.clone(), value.clone()).body(Body::empty()).unwrap())
        .await;
    let user_id = Uuid::parse_str(me["id"].as_str().unwrap()).unwrap();
    seed_five_uploads(&app, user_id).await;

    let (status, body) = app
        .request(
            Request::builder()
                .uri("/user/uploads?pageSize=0")
                .header(name, value)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["pageSize"], 10);
    assert_eq!(body["offset"], 0);
    assert_eq!(body["count"], 5);
    assert_eq!(body["items"].as_array().unwrap().len(), 5);

    app.cleanup().await;
}

#[tokio::test]
async fn a_valid_page_returns_the_requested_slice_and_total_count() {
    let app = TestApp::new("http://unused.invalid").await.expect("build test app");
    let token = sign_test_token("sub-pagination-slice", None);
    let (name, value) = bearer_header(&token);

    let (_, me) = app
        .request(Request::builder().uri("/user").header(name.clone(), value.clone()).body(Body::empty()).unwrap())
        .await;
    let user_id = Uuid::parse_str(me["id"].as_str().unwrap()).unwrap();
    seed_five_uploads(&app, user_id).await;

    let (status, body) = app
        .request(
            Request::builder()
                .uri("/user/uploads?offset=2&pageSize=2")
                .header(name, value)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["offset"], 2);
    assert_eq!(body["pageSize"], 2);
    assert_eq!(body["count"], 5);
    assert_eq!(body["items"].as_array().unwrap().len(), 2);

    app.cleanup().await;
}

#[tokio::test]
async fn downloads_listing_uses_the_same_pagination_contract() {
    let app = TestApp::new("http://unused.invalid").await.expect("build test app");
    let token = sign_test_token("sub-pagination-downloads", None);
    let (name, value) = bearer_header(&token);

    let (_, me) = app
        .request(Request::builder().uri("/user").header(name.clone(), value.clone()).body(Body::empty()).unwrap())
        .await;
    let user_id = Uuid::parse_str(me["id"].as_str().unwrap()).unwrap();

    for i in 0..3 {
        let fp = fingerprint(&format!("pagination-download-{i}"));
        let skylink_id = app.seed_skylink(&fp, 2048).await;
        sqlx::query(
            "INSERT INTO downloads (id, user_id, skylink_id, client_ip, bytes, created_at) VALUES ($1, $2, $3, NULL, 1024, NOW())",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(skylink_id)
        .execute(&app.pool)
        .await
        .unwrap();
    }

    let (status, body) = app
        .request(
            Request::builder()
                .uri("/user/downloads")
                .header(name, value)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["count"], 3);
    assert_eq!(body["pageSize"], 10);

    app.cleanup().await;
}
