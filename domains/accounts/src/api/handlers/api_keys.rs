//! `GET/POST/PUT/PATCH/DELETE /user/apikeys[/:id]`, per §6.
//!
//! `ApiKey` itself never derives `Serialize` (its `key_hash` must never
//! reach a response) so every handler here maps to [`ApiKeyResponse`],
//! which drops the hash; [`ApiKeyCreated`] additionally carries the raw
//! key, which only ever exists at creation time (§3).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use meridian_auth::AuthUser;
use meridian_common::extractors::ValidatedJson;
use meridian_common::Error as CommonError;

use crate::api::error::ApiError;
use crate::api::middleware::AccountsState;
use crate::domain::entities::ApiKey;

#[derive(Debug, Serialize)]
pub struct ApiKeyResponse {
    id: Uuid,
    #[serde(rename = "userId")]
    user_id: Uuid,
    name: String,
    public: bool,
    #[serde(rename = "coveredSkylinks")]
    covered_skylinks: Vec<String>,
    #[serde(rename = "createdAt")]
    created_at: DateTime<Utc>,
}

impl From<ApiKey> for ApiKeyResponse {
    fn from(key: ApiKey) -> Self {
        Self {
            id: key.id,
            user_id: key.user_id,
            name: key.name,
            public: key.public,
            covered_skylinks: key.covered_skylinks.0,
            created_at: key.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiKeyCreated {
    #[serde(flatten)]
    key: ApiKeyResponse,
    #[serde(rename = "rawKey")]
    raw_key: String,
}

pub async fn list_api_keys(
    State(state): State<AccountsState>,
    AuthUser(user, _): AuthUser,
) -> Result<Json<Vec<ApiKeyResponse>>, ApiError> {
    let keys = state.repos.api_keys.list_for_user(user.id).await?;
    Ok(Json(keys.into_iter().map(ApiKeyResponse::from).collect()))
}

pub async fn get_api_key(
    State(state): State<AccountsState>,
    AuthUser(user, _): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiKeyResponse>, ApiError> {
    let key = state
        .repos
        .api_keys
        .get_owned(user.id, id)
        .await?
        .ok_or_else(|| ApiError::Common(CommonError::NotFound("API key not found".to_string())))?;
    Ok(Json(ApiKeyResponse::from(key)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateApiKeyRequest {
    #[validate(length(min = 1, max = 100))]
    name: Option<String>,
    #[serde(default)]
    public: bool,
    #[serde(rename = "coveredSkylinks", default)]
    covered_skylinks: Vec<String>,
}

pub async fn create_api_key(
    State(state): State<AccountsState>,
    AuthUser(user, _): AuthUser,
    ValidatedJson(body): ValidatedJson<CreateApiKeyRequest>,
) -> Result<(StatusCode, Json<ApiKeyCreated>), ApiError> {
    let existing = state.repos.api_keys.count_for_user(user.id).await?;
    if existing as u32 >= state.max_api_keys_per_user {
        return Err(ApiError::Common(CommonError::Unprocessable(
            "maximum number of API keys reached".to_string(),
        )));
    }

    let (key, raw_key) = ApiKey::new(user.id, body.name, body.public, body.covered_skylinks)
        .map_err(ApiError::Common)?;
    state.repos.api_keys.insert(&key).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiKeyCreated {
            key: ApiKeyResponse::from(key),
            raw_key,
        }),
    ))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateApiKeyRequest {
    #[validate(length(min = 1, max = 100))]
    name: Option<String>,
    #[serde(rename = "coveredSkylinks")]
    covered_skylinks: Option<Vec<String>>,
}

/// Shared by `PUT` and `PATCH` — both only ever touch a public key's
/// name/covered-skylinks, per the Design Notes' resolved open question
/// that private keys are immutable except for deletion.
async fn update_api_key(
    state: &AccountsState,
    user_id: Uuid,
    id: Uuid,
    body: UpdateApiKeyRequest,
) -> Result<ApiKeyResponse, ApiError> {
    let existing = state
        .repos
        .api_keys
        .get_owned(user_id, id)
        .await?
        .ok_or_else(|| ApiError::Common(CommonError::NotFound("API key not found".to_string())))?;

    if !existing.public {
        return Err(ApiError::Common(CommonError::Forbidden(
            "private keys are immutable except for deletion".to_string(),
        )));
    }

    let updated = state
        .repos
        .api_keys
        .update_public_key(id, body.name.as_deref(), body.covered_skylinks.as_deref())
        .await?;
    Ok(ApiKeyResponse::from(updated))
}

pub async fn replace_api_key(
    State(state): State<AccountsState>,
    AuthUser(user, _): AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(body): ValidatedJson<UpdateApiKeyRequest>,
) -> Result<Json<ApiKeyResponse>, ApiError> {
    Ok(Json(update_api_key(&state, user.id, id, body).await?))
}

pub async fn patch_api_key(
    State(state): State<AccountsState>,
    AuthUser(user, _): AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(body): ValidatedJson<UpdateApiKeyRequest>,
) -> Result<Json<ApiKeyResponse>, ApiError> {
    Ok(Json(update_api_key(&state, user.id, id, body).await?))
}

pub async fn delete_api_key(
    State(state): State<AccountsState>,
    AuthUser(user, _): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.repos.api_keys.delete(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
