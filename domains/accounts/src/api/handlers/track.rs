//! `POST /track/upload/:skylink`, `POST /track/download/:skylink`,
//! `POST /track/registry/{read,write}`, per §4.6/§6.
//!
//! A caller presenting a token or API key is attributed to that user; a
//! caller presenting nothing is tracked as anonymous (§3's nullable
//! `user_id`, §4.3's "anonymous events do not count toward any user's
//! aggregate"). A caller presenting a credential that fails to verify is
//! still rejected — only the *absence* of a credential degrades to
//! anonymous.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use meridian_auth::{AuthError, ResolvedUser};
use meridian_common::Error as CommonError;
use meridian_fetcher::FetchMessage;

use crate::api::error::ApiError;
use crate::api::middleware::AccountsState;
use crate::domain::quota;
use crate::repository::{track_download, track_registry_read, track_registry_write, track_upload};

async fn resolve_track_user(
    state: &AccountsState,
    headers: &HeaderMap,
    method: &Method,
    path: &str,
) -> Result<Option<ResolvedUser>, ApiError> {
    match state.auth.resolve(headers, "", method, path, None, true).await {
        Ok((user, _)) => Ok(Some(user)),
        Err(AuthError::NoToken) | Err(AuthError::NoAPIKey) => Ok(None),
        Err(AuthError::Internal) => Err(ApiError::Auth(AuthError::Internal)),
        Err(other) => Err(ApiError::Auth(other)),
    }
}

fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|s| s.trim().to_string())
}

fn spawn_quota_reevaluation(state: &AccountsState, user_id: Option<Uuid>) {
    let Some(user_id) = user_id else { return };
    let pool = state.repos.pool().clone();
    let cache = state.tier_cache.clone();
    tokio::spawn(async move {
        if let Err(err) = quota::evaluate_and_persist(&pool, &cache, user_id).await {
            tracing::warn!(%err, %user_id, "quota re-evaluation after tracking event failed");
        }
    });
}

#[derive(Debug, Deserialize)]
pub struct BytesReport {
    bytes: i64,
}

/// `POST /track/upload/:skylink` — `bytes <= 0` means the size is
/// unknown at upload time; the skylink's metadata fetch is enqueued and
/// the fetcher fills in the real size later (§4.7).
pub async fn track_upload_event(
    State(state): State<AccountsState>,
    Path(fingerprint): Path<String>,
    headers: HeaderMap,
    method: Method,
    Json(body): Json<BytesReport>,
) -> Result<StatusCode, ApiError> {
    if body.bytes < 0 {
        return Err(ApiError::Common(CommonError::BadRequest(
            "upload size must not be negative".to_string(),
        )));
    }

    let path = format!("/track/upload/{fingerprint}");
    let user = resolve_track_user(&state, &headers, &method, &path).await?;
    let user_id = user.map(|u| u.id);

    let skylink = state.repos.skylinks.get_or_create(&fingerprint).await?;
    let ip = client_ip(&headers);

    track_upload(state.repos.pool(), user_id, skylink.id, None, body.bytes, ip.as_deref()).await?;

    if body.bytes <= 0 {
        state.fetcher.enqueue(FetchMessage {
            skylink_id: skylink.id,
            fingerprint,
            attempts: 0,
        });
    }

    spawn_quota_reevaluation(&state, user_id);
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /track/download/:skylink` — ignores zero-byte reports (browser
/// control fetches) and rejects negative sizes (§4.6).
pub async fn track_download_event(
    State(state): State<AccountsState>,
    Path(fingerprint): Path<String>,
    headers: HeaderMap,
    method: Method,
    Json(body): Json<BytesReport>,
) -> Result<StatusCode, ApiError> {
    if body.bytes < 0 {
        return Err(ApiError::Common(CommonError::BadRequest(
            "download size must not be negative".to_string(),
        )));
    }
    if body.bytes == 0 {
        return Ok(StatusCode::NO_CONTENT);
    }

    let path = format!("/track/download/{fingerprint}");
    let user = resolve_track_user(&state, &headers, &method, &path).await?;
    let user_id = user.map(|u| u.id);

    let skylink = state
        .repos
        .skylinks
        .get_by_fingerprint(&fingerprint)
        .await?
        .ok_or_else(|| ApiError::Common(CommonError::NotFound("skylink not found".to_string())))?;
    let ip = client_ip(&headers);

    track_download(state.repos.pool(), user_id, skylink.id, ip.as_deref(), body.bytes).await?;

    spawn_quota_reevaluation(&state, user_id);
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /track/registry/read`.
pub async fn track_registry_read_event(
    State(state): State<AccountsState>,
    headers: HeaderMap,
    method: Method,
) -> Result<StatusCode, ApiError> {
    let user = resolve_track_user(&state, &headers, &method, "/track/registry/read").await?;
    let user_id = user.map(|u| u.id);
    let ip = client_ip(&headers);

    track_registry_read(state.repos.pool(), user_id, ip.as_deref()).await?;

    spawn_quota_reevaluation(&state, user_id);
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /track/registry/write`.
pub async fn track_registry_write_event(
    State(state): State<AccountsState>,
    headers: HeaderMap,
    method: Method,
) -> Result<StatusCode, ApiError> {
    let user = resolve_track_user(&state, &headers, &method, "/track/registry/write").await?;
    let user_id = user.map(|u| u.id);
    let ip = client_ip(&headers);

    track_registry_write(state.repos.pool(), user_id, ip.as_deref()).await?;

    spawn_quota_reevaluation(&state, user_id);
    Ok(StatusCode::NO_CONTENT)
}
