//! `GET /user/downloads`, per §6.

use axum::extract::{Query, State};
use axum::Json;

use meridian_auth::AuthUser;

use crate::api::error::ApiError;
use crate::api::handlers::uploads::{PageResponse, PaginationQuery};
use crate::api::middleware::AccountsState;
use crate::domain::entities::Download;

/// `GET /user/downloads` — paginated listing of a user's download
/// reports.
pub async fn list_downloads(
    State(state): State<AccountsState>,
    AuthUser(user, _): AuthUser,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<PageResponse<Download>>, ApiError> {
    let (offset, page_size) = pagination.effective()?;

    let page = state.repos.downloads.list_for_user(user.id, offset, page_size).await?;
    Ok(Json(PageResponse {
        items: page.items,
        offset: page.offset,
        page_size: page.page_size,
        count: page.count,
    }))
}
