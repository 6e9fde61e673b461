use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;
use uuid::Uuid;

use pawmatch_shared::errors::AppResult;
use pawmatch_shared::types::auth::AuthUser;
use pawmatch_shared::types::ApiResponse;

use crate::routes::blocking;
use crate::services::views::{self, MatchView};
use crate::AppState;

/// GET /matches - matches of all the caller's pets, newest first
pub async fn list_matches(user: AuthUser, State(state): State<Arc<AppState>>) -> AppResult<Json<ApiResponse<Vec<MatchView>>>> {
    let matches = blocking(&state, move |s| views::list_matches(&s.store, user.id)).await?;
    Ok(Json(ApiResponse::ok(matches)))
}

/// GET /matches/:id
pub async fn get_match(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<MatchView>>> {
    let view = blocking(&state, move |s| views::match_view(&s.store, user.id, match_id)).await?;
    Ok(Json(ApiResponse::ok(view)))
}
