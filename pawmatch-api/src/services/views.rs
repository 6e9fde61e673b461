//! Read-only projections over the entity store.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use pawmatch_shared::errors::{AppError, AppResult};

use crate::models::{Match, Pet, PetImage};
use crate::services::access;
use crate::store::{Repository, Store};

#[derive(Debug, Clone, Serialize)]
pub struct PetView {
    #[serde(flatten)]
    pub pet: Pet,
    pub images: Vec<PetImage>,
    /// The pet's primary image, else its newest uploaded image.
    pub primary_image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LastMessage {
    pub sender_pet_id: Uuid,
    pub sender_pet_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchView {
    pub id: Uuid,
    pub pet_lo_id: Uuid,
    pub pet_hi_id: Uuid,
    pub pet_lo: PetView,
    pub pet_hi: PetView,
    pub last_message: Option<LastMessage>,
    pub created_at: DateTime<Utc>,
}

/// Attaches images to each pet, preserving input order. Images are loaded in one query.
pub fn pet_views(repo: &mut dyn Repository, pets: Vec<Pet>) -> AppResult<Vec<PetView>> {
    let ids: Vec<Uuid> = pets.iter().map(|p| p.id).collect();
    let mut by_pet: HashMap<Uuid, Vec<PetImage>> = HashMap::new();
    for image in repo.images_for_pets(&ids)? {
        by_pet.entry(image.pet_id).or_default().push(image);
    }

    Ok(pets
        .into_iter()
        .map(|pet| {
            let images = by_pet.remove(&pet.id).unwrap_or_default();
            let primary_image_url = pet
                .primary_image
                .clone()
                .or_else(|| images.first().map(|i| i.image_url.clone()));
            PetView { pet, images, primary_image_url }
        })
        .collect())
}

pub fn pet_view_of(repo: &mut dyn Repository, pet: Pet) -> AppResult<PetView> {
    pet_views(repo, vec![pet])?
        .pop()
        .ok_or_else(|| AppError::internal("pet view projection came back empty"))
}

pub fn match_view_of(repo: &mut dyn Repository, record: Match) -> AppResult<MatchView> {
    let lo = access::existing_pet(repo, record.pet_lo_id)?;
    let hi = access::existing_pet(repo, record.pet_hi_id)?;

    let last_message = repo.last_message(record.id)?.map(|m| LastMessage {
        sender_pet_name: if m.sender_pet_id == lo.id { lo.name.clone() } else { hi.name.clone() },
        sender_pet_id: m.sender_pet_id,
        content: m.content,
        created_at: m.created_at,
        is_read: m.is_read,
    });

    let mut pets = pet_views(repo, vec![lo, hi])?.into_iter();
    let (pet_lo, pet_hi) = match (pets.next(), pets.next()) {
        (Some(lo), Some(hi)) => (lo, hi),
        _ => return Err(AppError::internal("match view is missing a pet")),
    };

    Ok(MatchView {
        id: record.id,
        pet_lo_id: record.pet_lo_id,
        pet_hi_id: record.pet_hi_id,
        pet_lo,
        pet_hi,
        last_message,
        created_at: record.created_at,
    })
}

pub fn pet_view<S: Store>(store: &S, user_id: Uuid, pet_id: Uuid) -> AppResult<PetView> {
    store.transaction(|repo| {
        let pet = access::viewable_pet(repo, user_id, pet_id)?;
        pet_view_of(repo, pet)
    })
}

pub fn match_view<S: Store>(store: &S, user_id: Uuid, match_id: Uuid) -> AppResult<MatchView> {
    store.transaction(|repo| {
        let (record, _, _) = access::member_match(repo, user_id, match_id)?;
        match_view_of(repo, record)
    })
}

/// Every match of every pet the user owns, newest first.
pub fn list_matches<S: Store>(store: &S, user_id: Uuid) -> AppResult<Vec<MatchView>> {
    store.transaction(|repo| {
        let own_ids: Vec<Uuid> = repo.pets_by_owner(user_id)?.iter().map(|p| p.id).collect();
        if own_ids.is_empty() {
            return Ok(Vec::new());
        }

        repo.matches_for_pets(&own_ids)?
            .into_iter()
            .map(|record| match_view_of(repo, record))
            .collect()
    })
}
