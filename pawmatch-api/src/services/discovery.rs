//! Candidate filter: which pets an acting pet may still be shown.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Deserialize;
use uuid::Uuid;

use pawmatch_shared::errors::{AppError, AppResult};

use crate::config::DiscoveryConfig;
use crate::models::Pet;
use crate::services::access;
use crate::services::views::{pet_views, PetView};
use crate::store::{CandidateQuery, Repository, Store};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscoverRequest {
    /// Falls back to the owner's selected pet.
    pub pet_id: Option<Uuid>,
    pub limit: Option<usize>,
    /// Fixes the shuffle, mostly for tests and reproducible clients.
    pub seed: Option<u64>,
}

/// The pet a discovery request acts as.
fn acting_pet(repo: &mut dyn Repository, user_id: Uuid, pet_id: Option<Uuid>) -> AppResult<Pet> {
    let pet_id = match pet_id {
        Some(id) => id,
        None => repo
            .find_owner(user_id)?
            .and_then(|o| o.selected_pet_id)
            .ok_or_else(|| AppError::validation("pet_id is required when no pet is selected"))?,
    };

    match repo.find_pet(pet_id)? {
        Some(pet) if access::owns_pet(user_id, &pet) => Ok(pet),
        _ => Err(AppError::validation("pet_id must reference one of your pets")),
    }
}

/// Ids the acting pet has already liked, passed, or matched with, plus itself.
fn seen_by(repo: &mut dyn Repository, pet: &Pet) -> AppResult<Vec<Uuid>> {
    let mut excluded = repo.liked_targets(pet.id)?;
    excluded.extend(repo.passed_targets(pet.id)?);
    excluded.extend(
        repo.matches_for_pets(&[pet.id])?
            .iter()
            .filter_map(|m| m.other_pet(pet.id)),
    );
    excluded.push(pet.id);
    excluded.sort_unstable();
    excluded.dedup();
    Ok(excluded)
}

pub fn discover<S: Store>(
    store: &S,
    config: &DiscoveryConfig,
    user_id: Uuid,
    request: DiscoverRequest,
) -> AppResult<Vec<PetView>> {
    let limit = config.effective_limit(request.limit);

    let mut pool = store.transaction(|repo| {
        let pet = acting_pet(repo, user_id, request.pet_id)?;
        let query = CandidateQuery {
            pet_type: pet.pet_type,
            breed: config.same_breed.then(|| pet.breed.clone()),
            owner_id: pet.owner_id,
            excluded: seen_by(repo, &pet)?,
            pool_size: config.pool_size,
        };
        repo.candidate_pool(&query)
    })?;

    let mut rng = match request.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    pool.shuffle(&mut rng);
    pool.truncate(limit);

    store.transaction(|repo| pet_views(repo, pool))
}
