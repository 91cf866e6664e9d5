//! `GET/PUT/DELETE /user`, `GET /user/stats`, per §6.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use meridian_auth::AuthUser;

use crate::api::error::ApiError;
use crate::api::middleware::AccountsState;
use crate::domain::entities::User;
use crate::domain::quota::Aggregation;
use crate::repository::aggregate_for_user;

/// `GET /user` — the credential resolver already created the row on
/// first sighting (§4.1); this just hydrates the full record the
/// resolver's narrower `ResolvedUser` projection doesn't carry.
pub async fn get_current_user(
    State(state): State<AccountsState>,
    AuthUser(resolved, _): AuthUser,
) -> Result<Json<User>, ApiError> {
    let user = state
        .repos
        .users
        .get_by_id(resolved.id)
        .await?
        .ok_or_else(|| ApiError::Common(meridian_common::Error::NotFound("user not found".to_string())))?;
    Ok(Json(user))
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(rename = "customerId")]
    customer_id: String,
}

/// `PUT /user` — binds a payment-provider customer id, one-shot (§3/§6).
pub async fn update_current_user(
    State(state): State<AccountsState>,
    AuthUser(resolved, _): AuthUser,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<User>, ApiError> {
    state
        .repos
        .users
        .set_payment_customer_id(resolved.id, &body.customer_id)
        .await?;

    let user = state
        .repos
        .users
        .get_by_id(resolved.id)
        .await?
        .ok_or_else(|| ApiError::Common(meridian_common::Error::NotFound("user not found".to_string())))?;
    Ok(Json(user))
}

/// `DELETE /user` — deletes the user and every row it owns (§3
/// "Ownership").
pub async fn delete_current_user(
    State(state): State<AccountsState>,
    AuthUser(resolved, _): AuthUser,
) -> Result<StatusCode, ApiError> {
    state.repos.users.delete_cascade(resolved.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /user/stats` — per-user usage aggregates, the same numbers the
/// quota evaluator bases `quotaExceeded` on (§4.3).
pub async fn user_stats(
    State(state): State<AccountsState>,
    AuthUser(resolved, _): AuthUser,
) -> Result<Json<Aggregation>, ApiError> {
    let aggregation = aggregate_for_user(state.repos.pool(), resolved.id).await?;
    Ok(Json(aggregation))
}
