use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use pawmatch_shared::errors::AppResult;
use pawmatch_shared::types::auth::AuthUser;
use pawmatch_shared::types::ApiResponse;

use crate::models::{Owner, PetChanges, PetDraft, PetImage};
use crate::routes::blocking;
use crate::services::pets::{self as pet_service, OwnerProfile};
use crate::services::views::{self, PetView};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AddImageRequest {
    pub image_url: String,
}

/// GET /me - the caller's selected pet and pet count
pub async fn me(user: AuthUser, State(state): State<Arc<AppState>>) -> AppResult<Json<ApiResponse<OwnerProfile>>> {
    let profile = blocking(&state, move |s| pet_service::owner_profile(&s.store, user.id)).await?;
    Ok(Json(ApiResponse::ok(profile)))
}

/// GET /pets - the caller's pets, newest first
pub async fn list_pets(user: AuthUser, State(state): State<Arc<AppState>>) -> AppResult<Json<ApiResponse<Vec<PetView>>>> {
    let pets = blocking(&state, move |s| pet_service::list_own_pets(&s.store, user.id)).await?;
    Ok(Json(ApiResponse::ok(pets)))
}

/// POST /pets - register a pet
pub async fn create_pet(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(draft): Json<PetDraft>,
) -> AppResult<(StatusCode, Json<ApiResponse<PetView>>)> {
    let view = blocking(&state, move |s| pet_service::create_pet(&s.store, user.id, draft)).await?;
    tracing::info!(pet_id = %view.pet.id, owner_id = %user.id, "pet created");
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(view))))
}

/// GET /pets/:id - visible to the owner and to owners of matched pets
pub async fn get_pet(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(pet_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PetView>>> {
    let view = blocking(&state, move |s| views::pet_view(&s.store, user.id, pet_id)).await?;
    Ok(Json(ApiResponse::ok(view)))
}

/// PATCH /pets/:id
pub async fn update_pet(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(pet_id): Path<Uuid>,
    Json(changes): Json<PetChanges>,
) -> AppResult<Json<ApiResponse<PetView>>> {
    let view = blocking(&state, move |s| pet_service::update_pet(&s.store, user.id, pet_id, changes)).await?;
    tracing::info!(pet_id = %pet_id, "pet updated");
    Ok(Json(ApiResponse::ok(view)))
}

/// DELETE /pets/:id - removes the pet and everything attached to it
pub async fn delete_pet(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(pet_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    blocking(&state, move |s| pet_service::delete_pet(&s.store, user.id, pet_id)).await?;
    tracing::info!(pet_id = %pet_id, owner_id = %user.id, "pet deleted");
    Ok(Json(ApiResponse::ok_with_message((), "pet deleted")))
}

/// POST /pets/:id/select
pub async fn select_pet(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(pet_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Owner>>> {
    let owner = blocking(&state, move |s| pet_service::select_pet(&s.store, user.id, pet_id)).await?;
    Ok(Json(ApiResponse::ok(owner)))
}

/// GET /pets/:id/images
pub async fn list_images(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(pet_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<PetImage>>>> {
    let images = blocking(&state, move |s| pet_service::list_images(&s.store, user.id, pet_id)).await?;
    Ok(Json(ApiResponse::ok(images)))
}

/// POST /pets/:id/images - attach an image reference
pub async fn add_image(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(pet_id): Path<Uuid>,
    Json(req): Json<AddImageRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<PetImage>>)> {
    let image = blocking(&state, move |s| {
        pet_service::add_image(&s.store, user.id, pet_id, &req.image_url)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(image))))
}
