//! `GET/POST /register` and `GET/POST /user/pubkey/register`, `DELETE
//! /user/pubkey/:pk`, per §4.8/§6 — the two challenge-gated key flows.
//! Both share the same two-step shape: a `GET` mints a nonce for a
//! caller-supplied public key, a `POST` proves possession of the
//! matching private key and commits the side effect (new account,
//! additional bound key).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use meridian_auth::AuthUser;

use crate::api::error::ApiError;
use crate::api::middleware::AccountsState;
use crate::domain::challenge::{new_challenge, validate_response};
use crate::domain::entities::{ChallengeIntent, PublicKeyBinding, User};

#[derive(Debug, Deserialize)]
pub struct ChallengeQuery {
    #[serde(rename = "publicKey")]
    public_key: String,
}

#[derive(Debug, Serialize)]
pub struct ChallengeIssued {
    nonce: String,
    intent: ChallengeIntent,
    /// The exact byte string the caller must sign with the private half
    /// of the public key it supplied.
    response: String,
}

#[derive(Debug, Deserialize)]
pub struct SolveChallenge {
    response: String,
    signature: String,
}

/// `GET /register` — issue a fresh registration challenge for a
/// not-yet-bound public key.
pub async fn start_register(
    State(state): State<AccountsState>,
    Query(query): Query<ChallengeQuery>,
) -> Result<Json<ChallengeIssued>, ApiError> {
    let challenge =
        new_challenge(&state.repos.challenges, query.public_key, ChallengeIntent::Register).await?;
    let response = challenge.expected_response(&state.portal_name);
    Ok(Json(ChallengeIssued {
        nonce: challenge.nonce,
        intent: challenge.intent,
        response,
    }))
}

/// `POST /register` — solve the challenge, provision a new identity keyed
/// on the verified public key, and bind the key to it.
pub async fn complete_register(
    State(state): State<AccountsState>,
    Json(body): Json<SolveChallenge>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let public_key = validate_response(
        &state.repos.challenges,
        &state.portal_name,
        &body.response,
        &body.signature,
    )
    .await?;

    let sub = format!("pubkey:{public_key}");
    let user = state.repos.users.provision_by_sub(&sub).await?;
    state.repos.pubkeys.bind(user.id, &public_key).await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// `GET /user/pubkey/register` — issue a challenge binding an additional
/// public key to the already-authenticated caller.
pub async fn start_bind_pubkey(
    State(state): State<AccountsState>,
    AuthUser(_user, _): AuthUser,
    Query(query): Query<ChallengeQuery>,
) -> Result<Json<ChallengeIssued>, ApiError> {
    let challenge =
        new_challenge(&state.repos.challenges, query.public_key, ChallengeIntent::Update).await?;
    let response = challenge.expected_response(&state.portal_name);
    Ok(Json(ChallengeIssued {
        nonce: challenge.nonce,
        intent: challenge.intent,
        response,
    }))
}

/// `POST /user/pubkey/register` — solve the challenge and bind the
/// verified public key to the authenticated user.
pub async fn complete_bind_pubkey(
    State(state): State<AccountsState>,
    AuthUser(user, _): AuthUser,
    Json(body): Json<SolveChallenge>,
) -> Result<(StatusCode, Json<PublicKeyBinding>), ApiError> {
    let public_key = validate_response(
        &state.repos.challenges,
        &state.portal_name,
        &body.response,
        &body.signature,
    )
    .await?;

    let binding = state.repos.pubkeys.bind(user.id, &public_key).await?;
    Ok((StatusCode::CREATED, Json(binding)))
}

/// `DELETE /user/pubkey/:pk` — unbind a key the caller already owns; no
/// fresh challenge needed, the caller's own token is proof enough.
pub async fn unbind_pubkey(
    State(state): State<AccountsState>,
    AuthUser(user, _): AuthUser,
    Path(public_key): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.repos.pubkeys.unbind(user.id, &public_key).await?;
    Ok(StatusCode::NO_CONTENT)
}
