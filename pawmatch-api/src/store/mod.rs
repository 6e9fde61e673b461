//! Entity store seam.
//!
//! Services talk to persistence only through [`Repository`], always inside a
//! [`Store::transaction`], so every operation commits or rolls back as a unit.
//! Uniqueness of likes, passes and matches is enforced by the store itself:
//! the `insert_*` methods are insert-or-nothing and report a lost race as `None`.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use uuid::Uuid;

use pawmatch_shared::errors::{AppError, AppResult};

use crate::models::{Like, Match, Message, Owner, Pass, Pet, PetChanges, PetImage, PetPair, PetType, NewPet};

const MAX_CONFLICT_ATTEMPTS: usize = 3;

/// Filter pushed down to the store when building the discovery pool.
#[derive(Debug, Clone)]
pub struct CandidateQuery {
    pub pet_type: PetType,
    pub breed: Option<String>,
    pub owner_id: Uuid,
    pub excluded: Vec<Uuid>,
    pub pool_size: i64,
}

impl CandidateQuery {
    pub fn admits(&self, pet: &Pet) -> bool {
        pet.pet_type == self.pet_type
            && pet.is_active
            && pet.owner_id != self.owner_id
            && self.breed.as_ref().map_or(true, |b| *b == pet.breed)
            && !self.excluded.contains(&pet.id)
    }
}

pub trait Repository {
    // Pets
    fn insert_pet(&mut self, pet: NewPet) -> AppResult<Pet>;
    fn find_pet(&mut self, id: Uuid) -> AppResult<Option<Pet>>;
    fn pets_by_ids(&mut self, ids: &[Uuid]) -> AppResult<Vec<Pet>>;
    /// Newest first.
    fn pets_by_owner(&mut self, owner_id: Uuid) -> AppResult<Vec<Pet>>;
    fn update_pet(&mut self, id: Uuid, changes: &PetChanges) -> AppResult<Pet>;
    /// Removes the pet and everything that hangs off it. Returns false if it did not exist.
    fn delete_pet(&mut self, id: Uuid) -> AppResult<bool>;
    /// Deterministic order: newest first, then id.
    fn candidate_pool(&mut self, query: &CandidateQuery) -> AppResult<Vec<Pet>>;

    // Images
    fn insert_image(&mut self, image: PetImage) -> AppResult<PetImage>;
    /// Newest first.
    fn images_for_pets(&mut self, pet_ids: &[Uuid]) -> AppResult<Vec<PetImage>>;

    // Likes and passes
    fn insert_like(&mut self, like: Like) -> AppResult<Option<Like>>;
    fn like_exists(&mut self, from_pet_id: Uuid, to_pet_id: Uuid) -> AppResult<bool>;
    fn liked_targets(&mut self, from_pet_id: Uuid) -> AppResult<Vec<Uuid>>;
    fn insert_pass(&mut self, pass: Pass) -> AppResult<Option<Pass>>;
    fn find_pass(&mut self, from_pet_id: Uuid, to_pet_id: Uuid) -> AppResult<Option<Pass>>;
    fn passed_targets(&mut self, from_pet_id: Uuid) -> AppResult<Vec<Uuid>>;
    /// Held until the surrounding transaction ends.
    fn lock_pair(&mut self, pair: &PetPair) -> AppResult<()>;

    // Matches
    fn insert_match(&mut self, record: Match) -> AppResult<Option<Match>>;
    fn find_match(&mut self, id: Uuid) -> AppResult<Option<Match>>;
    fn find_match_by_pair(&mut self, pair: &PetPair) -> AppResult<Option<Match>>;
    /// Matches that include any of `pet_ids`, newest first.
    fn matches_for_pets(&mut self, pet_ids: &[Uuid]) -> AppResult<Vec<Match>>;

    // Messages
    fn insert_message(&mut self, message: Message) -> AppResult<Message>;
    /// Conversation order: oldest first.
    fn messages_for_match(&mut self, match_id: Uuid) -> AppResult<Vec<Message>>;
    fn last_message(&mut self, match_id: Uuid) -> AppResult<Option<Message>>;
    /// Flips unread messages from `sender_pet_id` to read. Returns how many changed.
    fn mark_read_from(&mut self, match_id: Uuid, sender_pet_id: Uuid) -> AppResult<usize>;

    // Owners
    fn find_owner(&mut self, user_id: Uuid) -> AppResult<Option<Owner>>;
    fn set_selected_pet(&mut self, user_id: Uuid, pet_id: Uuid) -> AppResult<Owner>;
}

pub trait Store: Send + Sync {
    /// Runs `f` atomically: its writes commit only if it returns `Ok`.
    fn transaction<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&mut dyn Repository) -> AppResult<T>;

    fn ping(&self) -> AppResult<()> {
        self.transaction(|_| Ok(()))
    }
}

/// Reruns `op` while it fails with a retryable store conflict.
pub fn retry_on_conflict<T>(mut op: impl FnMut() -> AppResult<T>) -> AppResult<T> {
    let mut attempt = 1;
    loop {
        match op() {
            Err(err) if err.is_retryable() => {
                if attempt >= MAX_CONFLICT_ATTEMPTS {
                    return Err(AppError::internal(format!(
                        "store conflict persisted after {attempt} attempts: {err}"
                    )));
                }
                tracing::debug!(attempt, error = %err, "retrying after store conflict");
                attempt += 1;
            }
            other => return other,
        }
    }
}

/// Storage backend selected by configuration.
pub enum Backend {
    Postgres(PgStore),
    Memory(MemoryStore),
}

impl Store for Backend {
    fn transaction<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&mut dyn Repository) -> AppResult<T>,
    {
        match self {
            Backend::Postgres(store) => store.transaction(f),
            Backend::Memory(store) => store.transaction(f),
        }
    }
}
