//! `GET /health` — no auth, per §6.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::middleware::AccountsState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    #[serde(rename = "dbAlive")]
    db_alive: bool,
}

pub async fn health(State(state): State<AccountsState>) -> Json<HealthResponse> {
    let db_alive = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(state.repos.pool())
        .await
        .is_ok();
    Json(HealthResponse { db_alive })
}
