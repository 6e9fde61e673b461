use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use pawmatch_shared::errors::AppResult;
use pawmatch_shared::types::auth::AuthUser;
use pawmatch_shared::types::ApiResponse;

use crate::models::Message;
use crate::routes::blocking;
use crate::services::conversation;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub sender_pet_id: Uuid,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub marked: usize,
}

/// GET /matches/:id/messages - the conversation, oldest first
pub async fn list_messages(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<Message>>>> {
    let messages = blocking(&state, move |s| conversation::list_messages(&s.store, user.id, match_id)).await?;
    Ok(Json(ApiResponse::ok(messages)))
}

/// POST /matches/:id/messages
pub async fn send_message(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Message>>)> {
    let message = blocking(&state, move |s| {
        conversation::post_message(&s.store, user.id, match_id, req.sender_pet_id, &req.content)
    })
    .await?;

    tracing::info!(match_id = %match_id, message_id = %message.id, "message sent");
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(message))))
}

/// PATCH /matches/:id/messages/read - mark the other pet's messages as read
pub async fn mark_read(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<MarkReadResponse>>> {
    let marked = blocking(&state, move |s| conversation::mark_read(&s.store, user.id, match_id)).await?;
    Ok(Json(ApiResponse::ok(MarkReadResponse { marked })))
}
