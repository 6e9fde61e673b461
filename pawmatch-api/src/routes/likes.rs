use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use pawmatch_shared::errors::AppResult;
use pawmatch_shared::types::auth::AuthUser;
use pawmatch_shared::types::ApiResponse;

use crate::routes::blocking;
use crate::services::interactions::{self, LikeOutcome, PassOutcome};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct InteractionRequest {
    pub from_pet: Uuid,
    pub to_pet: Uuid,
}

/// POST /likes - like another pet, matching when the like is mutual
pub async fn send_like(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<InteractionRequest>,
) -> AppResult<Json<ApiResponse<LikeOutcome>>> {
    let outcome = blocking(&state, move |s| {
        interactions::record_like(&s.store, user.id, req.from_pet, req.to_pet)
    })
    .await?;

    tracing::info!(from_pet = %req.from_pet, to_pet = %req.to_pet, is_match = outcome.is_match, "like recorded");
    if let Some(matched) = &outcome.matched {
        tracing::info!(match_id = %matched.id, "match created");
    }
    Ok(Json(ApiResponse::ok(outcome)))
}

/// POST /passes - pass on a pet; repeating a pass is a no-op
pub async fn send_pass(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<InteractionRequest>,
) -> AppResult<Json<ApiResponse<PassOutcome>>> {
    let outcome = blocking(&state, move |s| {
        interactions::record_pass(&s.store, user.id, req.from_pet, req.to_pet)
    })
    .await?;

    if outcome.created {
        tracing::info!(from_pet = %req.from_pet, to_pet = %req.to_pet, "pass recorded");
    }
    Ok(Json(ApiResponse::ok(outcome)))
}
