use axum::extract::{Query, State};
use axum::Json;
use std::sync::Arc;

use pawmatch_shared::errors::AppResult;
use pawmatch_shared::types::auth::AuthUser;
use pawmatch_shared::types::ApiResponse;

use crate::routes::blocking;
use crate::services::discovery::{self, DiscoverRequest};
use crate::services::views::PetView;
use crate::AppState;

/// GET /discover?pet_id&limit&seed - candidates the acting pet has not seen yet
pub async fn discover(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<DiscoverRequest>,
) -> AppResult<Json<ApiResponse<Vec<PetView>>>> {
    let candidates = blocking(&state, move |s| {
        discovery::discover(&s.store, &s.config.discovery, user.id, params)
    })
    .await?;
    Ok(Json(ApiResponse::ok(candidates)))
}
