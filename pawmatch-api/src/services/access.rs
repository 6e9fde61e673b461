//! Ownership rules binding pets and matches to the acting user.

use uuid::Uuid;

use pawmatch_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{Match, Pet};
use crate::store::Repository;

pub fn owns_pet(user_id: Uuid, pet: &Pet) -> bool {
    pet.owner_id == user_id
}

/// True when `user_id` owns at least one of the match's pets.
pub fn member_of_match(repo: &mut dyn Repository, user_id: Uuid, record: &Match) -> AppResult<bool> {
    Ok(member_pets(repo, user_id, record)?.is_some())
}

pub fn existing_pet(repo: &mut dyn Repository, pet_id: Uuid) -> AppResult<Pet> {
    repo.find_pet(pet_id)?
        .ok_or_else(|| AppError::new(ErrorCode::PetNotFound, "pet not found"))
}

/// The pet, provided `user_id` owns it.
pub fn owned_pet(repo: &mut dyn Repository, user_id: Uuid, pet_id: Uuid) -> AppResult<Pet> {
    let pet = existing_pet(repo, pet_id)?;
    if !owns_pet(user_id, &pet) {
        return Err(AppError::forbidden("you do not own this pet"));
    }
    Ok(pet)
}

pub fn existing_match(repo: &mut dyn Repository, match_id: Uuid) -> AppResult<Match> {
    repo.find_match(match_id)?
        .ok_or_else(|| AppError::new(ErrorCode::MatchNotFound, "match not found"))
}

/// Splits a match into (the caller's pet, the other pet).
///
/// When the caller owns both pets their side is `pet_lo`. `None` when they own neither.
pub fn member_pets(repo: &mut dyn Repository, user_id: Uuid, record: &Match) -> AppResult<Option<(Pet, Pet)>> {
    let lo = existing_pet(repo, record.pet_lo_id)?;
    let hi = existing_pet(repo, record.pet_hi_id)?;

    if owns_pet(user_id, &lo) {
        Ok(Some((lo, hi)))
    } else if owns_pet(user_id, &hi) {
        Ok(Some((hi, lo)))
    } else {
        Ok(None)
    }
}

/// The match, provided `user_id` owns one of its pets.
pub fn member_match(repo: &mut dyn Repository, user_id: Uuid, match_id: Uuid) -> AppResult<(Match, Pet, Pet)> {
    let record = existing_match(repo, match_id)?;
    let (mine, other) = member_pets(repo, user_id, &record)?
        .ok_or_else(|| AppError::new(ErrorCode::NotMatchMember, "you are not part of this match"))?;
    Ok((record, mine, other))
}

/// Owners see their own pets; other owners see a pet once it matched with one of theirs.
pub fn can_view_pet(repo: &mut dyn Repository, user_id: Uuid, pet: &Pet) -> AppResult<bool> {
    if owns_pet(user_id, pet) {
        return Ok(true);
    }

    let own_ids: Vec<Uuid> = repo.pets_by_owner(user_id)?.iter().map(|p| p.id).collect();
    if own_ids.is_empty() {
        return Ok(false);
    }

    Ok(repo
        .matches_for_pets(&own_ids)?
        .iter()
        .any(|m| m.has_pet(pet.id)))
}

pub fn viewable_pet(repo: &mut dyn Repository, user_id: Uuid, pet_id: Uuid) -> AppResult<Pet> {
    let pet = existing_pet(repo, pet_id)?;
    if !can_view_pet(repo, user_id, &pet)? {
        return Err(AppError::forbidden("you cannot view this pet"));
    }
    Ok(pet)
}
