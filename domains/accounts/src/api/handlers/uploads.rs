//! `GET /user/uploads`, `DELETE /user/uploads/:skylink`, `DELETE
//! /skylink/:skylink`, per §6.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use meridian_auth::AuthUser;
use meridian_common::Error as CommonError;

use crate::api::error::ApiError;
use crate::api::middleware::AccountsState;
use crate::domain::entities::Upload;
use crate::domain::quota;
use crate::repository::transactions::unpin_upload;

/// `pageSize=0` means "use the default," per §6 Pagination.
const DEFAULT_PAGE_SIZE: i64 = 10;

#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    pub offset: Option<i64>,
    #[serde(rename = "pageSize")]
    pub page_size: Option<i64>,
}

impl PaginationQuery {
    /// `offset >= 0`, `pageSize >= 0` (0 means the default); negative
    /// values of either are rejected with 400, per §6 Pagination — this
    /// is deliberately not a silent clamp.
    pub fn effective(&self) -> Result<(i64, i64), ApiError> {
        let offset = self.offset.unwrap_or(0);
        if offset < 0 {
            return Err(ApiError::Common(CommonError::BadRequest(
                "offset must not be negative".to_string(),
            )));
        }

        let page_size = match self.page_size.unwrap_or(0) {
            0 => DEFAULT_PAGE_SIZE,
            n if n < 0 => {
                return Err(ApiError::Common(CommonError::BadRequest(
                    "pageSize must not be negative".to_string(),
                )))
            }
            n => n,
        };

        Ok((offset, page_size))
    }
}

#[derive(Debug, Serialize)]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub offset: i64,
    #[serde(rename = "pageSize")]
    pub page_size: i64,
    pub count: i64,
}

/// `GET /user/uploads` — paginated listing of a user's upload events.
pub async fn list_uploads(
    State(state): State<AccountsState>,
    AuthUser(user, _): AuthUser,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<PageResponse<Upload>>, ApiError> {
    let (offset, page_size) = pagination.effective()?;

    let page = state.repos.uploads.list_for_user(user.id, offset, page_size).await?;
    Ok(Json(PageResponse {
        items: page.items,
        offset: page.offset,
        page_size: page.page_size,
        count: page.count,
    }))
}

async fn unpin_by_fingerprint(state: &AccountsState, user_id: uuid::Uuid, fingerprint: &str) -> Result<(), ApiError> {
    let skylink = state
        .repos
        .skylinks
        .get_by_fingerprint(fingerprint)
        .await?
        .ok_or_else(|| ApiError::Common(meridian_common::Error::NotFound("skylink not found".to_string())))?;

    unpin_upload(state.repos.pool(), user_id, skylink.id).await?;

    let pool = state.repos.pool().clone();
    let cache = state.tier_cache.clone();
    tokio::spawn(async move {
        if let Err(err) = quota::evaluate_and_persist(&pool, &cache, user_id).await {
            tracing::warn!(%err, %user_id, "quota re-evaluation after unpin failed");
        }
    });

    Ok(())
}

/// `DELETE /user/uploads/:skylink` — unpin the caller's own uploads of a
/// skylink.
pub async fn unpin_user_upload(
    State(state): State<AccountsState>,
    AuthUser(user, _): AuthUser,
    Path(fingerprint): Path<String>,
) -> Result<StatusCode, ApiError> {
    unpin_by_fingerprint(&state, user.id, &fingerprint).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /skylink/:skylink` — same effect as `unpin_user_upload`, kept
/// as a distinct route per §6's table (the two endpoints unpin identical
/// rows; they differ only in how the caller names the resource).
pub async fn unpin_skylink(
    State(state): State<AccountsState>,
    AuthUser(user, _): AuthUser,
    Path(fingerprint): Path<String>,
) -> Result<StatusCode, ApiError> {
    unpin_by_fingerprint(&state, user.id, &fingerprint).await?;
    Ok(StatusCode::NO_CONTENT)
}
