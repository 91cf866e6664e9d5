//! The Ed25519 challenge-response flows behind `/register` and
//! `/user/pubkey/*`: successful end-to-end register/bind/unbind, the
//! single-use (replay) guarantee, and each distinct tamper producing its
//! own typed HTTP error.

mod common;

use axum::body::Body;
use axum::http::Request;
use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;
use serde_json::json;

use common::{bearer_header, sign_test_token, TestApp};

fn keypair() -> (SigningKey, String) {
    let signing_key = SigningKey::generate(&mut OsRng);
    let public_key_hex = hex::encode(signing_key.verifying_key().to_bytes());
    (signing_key, public_key_hex)
}

async fn start_register(app: &TestApp, public_key_hex: &str) -> serde_json::Value {
    let (status, body) = app
        .request(
            Request::builder()
                .uri(format!("/register?publicKey={public_key_hex}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, 200);
    body
}

#[tokio::test]
async fn register_provisions_a_user_keyed_on_the_public_key() {
    let app = TestApp::new("http://unused.invalid").await.expect("build test app");
    let (signing_key, public_key_hex) = keypair();

    let issued = start_register(&app, &public_key_hex).await;
    let response = issued["response"].as_str().unwrap();
    let signature_hex = hex::encode(signing_key.sign(response.as_bytes()).to_bytes());

    let (status, body) = app
        .request(
            Request::builder()
                .method("POST")
                .uri("/register")
                .header("content-type", "application/json")
                .body(Body::from(json!({"response": response, "signature": signature_hex}).to_string()))
                .unwrap(),
        )
        .await;

    assert_eq!(status, 201);
    assert_eq!(body["sub"], format!("pubkey:{public_key_hex}"));
    assert_eq!(body["tier"], 1); // Free

    app.cleanup().await;
}

#[tokio::test]
async fn a_solved_challenge_cannot_be_replayed() {
    let app = TestApp::new("http://unused.invalid").await.expect("build test app");
    let (signing_key, public_key_hex) = keypair();

    let issued = start_register(&app, &public_key_hex).await;
    let response = issued["response"].as_str().unwrap().to_string();
    let signature_hex = hex::encode(signing_key.sign(response.as_bytes()).to_bytes());

    let solve = json!({"response": response, "signature": signature_hex}).to_string();

    let (status1, _) = app
        .request(
            Request::builder()
                .method("POST")
                .uri("/register")
                .header("content-type", "application/json")
                .body(Body::from(solve.clone()))
                .unwrap(),
        )
        .await;
    assert_eq!(status1, 201);

    let (status2, body2) = app
        .request(
            Request::builder()
                .method("POST")
                .uri("/register")
                .header("content-type", "application/json")
                .body(Body::from(solve))
                .unwrap(),
        )
        .await;
    assert_eq!(status2, 404);
    assert!(body2["message"].as_str().unwrap().contains("not found"));

    app.cleanup().await;
}

#[tokio::test]
async fn tampered_signature_is_rejected_with_its_own_error() {
    let app = TestApp::new("http://unused.invalid").await.expect("build test app");
    let (signing_key, public_key_hex) = keypair();

    let issued = start_register(&app, &public_key_hex).await;
    let response = issued["response"].as_str().unwrap().to_string();
    let mut signature_hex = hex::encode(signing_key.sign(response.as_bytes()).to_bytes());
    signature_hex.replace_range(0..2, "ff");

    let (status, body) = app
        .request(
            Request::builder()
                .method("POST")
                .uri("/register")
                .header("content-type", "application/json")
                .body(Body::from(json!({"response": response, "signature": signature_hex}).to_string()))
                .unwrap(),
        )
        .await;
    assert_eq!(status, 400);
    assert!(body["message"].as_str().unwrap().contains("signature"));

    app.cleanup().await;
}

#[tokio::test]
async fn mismatched_recipient_is_rejected_before_any_lookup() {
    let app = TestApp::new("http://unused.invalid").await.expect("build test app");
    let (signing_key, public_key_hex) = keypair();

    let issued = start_register(&app, &public_key_hex).await;
    let nonce = issued["nonce"].as_str().unwrap();
    let forged_response = format!("{nonce}registerwrong-portal.invalid");
    let signature_hex = hex::encode(signing_key.sign(forged_response.as_bytes()).to_bytes());

    let (status, body) = app
        .request(
            Request::builder()
                .method("POST")
                .uri("/register")
                .header("content-type", "application/json")
                .body(Body::from(json!({"response": forged_response, "signature": signature_hex}).to_string()))
                .unwrap(),
        )
        .await;
    assert_eq!(status, 400);
    assert!(body["message"].as_str().unwrap().contains("recipient"));

    app.cleanup().await;
}

#[tokio::test]
async fn intent_mismatch_is_rejected_with_its_own_error() {
    let app = TestApp::new("http://unused.invalid").await.expect("build test app");
    let (signing_key, public_key_hex) = keypair();

    // A challenge issued with intent=register, solved as if it were login.
    let issued = start_register(&app, &public_key_hex).await;
    let nonce = issued["nonce"].as_str().unwrap();
    let forged_response = format!("{nonce}login{}", common::TEST_PORTAL_NAME);
    let signature_hex = hex::encode(signing_key.sign(forged_response.as_bytes()).to_bytes());

    let (status, body) = app
        .request(
            Request::builder()
                .method("POST")
                .uri("/register")
                .header("content-type", "application/json")
                .body(Body::from(json!({"response": forged_response, "signature": signature_hex}).to_string()))
                .unwrap(),
        )
        .await;
    assert_eq!(status, 400);
    assert!(body["message"].as_str().unwrap().contains("type"));

    app.cleanup().await;
}

#[tokio::test]
async fn malformed_public_key_surfaces_its_own_error() {
    let app = TestApp::new("http://unused.invalid").await.expect("build test app");

    let issued = start_register(&app, "not-a-valid-hex-key").await;
    let response = issued["response"].as_str().unwrap();

    let (status, body) = app
        .request(
            Request::builder()
                .method("POST")
                .uri("/register")
                .header("content-type", "application/json")
                .body(Body::from(json!({"response": response, "signature": "00"}).to_string()))
                .unwrap(),
        )
        .await;
    assert_eq!(status, 400);
    assert!(body["message"].as_str().unwrap().contains("public key"));

    app.cleanup().await;
}

#[tokio::test]
async fn unknown_nonce_is_reported_not_found() {
    let app = TestApp::new("http://unused.invalid").await.expect("build test app");

    let fake_nonce = "a".repeat(64);
    let forged_response = format!("{fake_nonce}register{}", common::TEST_PORTAL_NAME);

    let (status, _) = app
        .request(
            Request::builder()
                .method("POST")
                .uri("/register")
                .header("content-type", "application/json")
                .body(Body::from(json!({"response": forged_response, "signature": "00"}).to_string()))
                .unwrap(),
        )
        .await;
    assert_eq!(status, 404);

    app.cleanup().await;
}

#[tokio::test]
async fn authenticated_users_can_bind_and_unbind_an_additional_public_key() {
    let app = TestApp::new("http://unused.invalid").await.expect("build test app");
    let token = sign_test_token("sub-bind-pubkey", None);
    let (auth_name, auth_value) = bearer_header(&token);
    let (signing_key, public_key_hex) = keypair();

    let (status, issued) = app
        .request(
            Request::builder()
                .uri(format!("/user/pubkey/register?publicKey={public_key_hex}"))
                .header(auth_name, auth_value.clone())
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, 200);
    let response = issued["response"].as_str().unwrap();
    let signature_hex = hex::encode(signing_key.sign(response.as_bytes()).to_bytes());

    let (status, binding) = app
        .request(
            Request::builder()
                .method("POST")
                .uri("/user/pubkey/register")
                .header(auth_name, auth_value.clone())
                .header("content-type", "application/json")
                .body(Body::from(json!({"response": response, "signature": signature_hex}).to_string()))
                .unwrap(),
        )
        .await;
    assert_eq!(status, 201);
    assert_eq!(binding["public_key"], public_key_hex);

    let (status, _) = app
        .request(
            Request::builder()
                .method("DELETE")
                .uri(format!("/user/pubkey/{public_key_hex}"))
                .header(auth_name, auth_value)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, 204);

    app.cleanup().await;
}
