use std::sync::Mutex;

use chrono::Utc;
use uuid::Uuid;

use pawmatch_shared::errors::{AppError, AppResult, ErrorCode};

use super::{CandidateQuery, Repository, Store};
use crate::models::{Like, Match, Message, NewPet, Owner, Pass, Pet, PetChanges, PetImage, PetPair};

/// In-process store. Transactions are serialized behind one lock and run
/// against a copy of the tables that replaces the original only on success.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    pets: Vec<Pet>,
    images: Vec<PetImage>,
    likes: Vec<Like>,
    passes: Vec<Pass>,
    matches: Vec<Match>,
    messages: Vec<Message>,
    owners: Vec<Owner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn transaction<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&mut dyn Repository) -> AppResult<T>,
    {
        let mut committed = self
            .tables
            .lock()
            .map_err(|_| AppError::internal("memory store lock poisoned"))?;

        let mut working = committed.clone();
        let result = f(&mut working)?;
        *committed = working;
        Ok(result)
    }
}

fn newest_first<T, K: Ord>(items: &mut [T], key: impl Fn(&T) -> K) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

impl Repository for Tables {
    fn insert_pet(&mut self, pet: NewPet) -> AppResult<Pet> {
        let pet = pet.into_pet();
        self.pets.push(pet.clone());
        Ok(pet)
    }

    fn find_pet(&mut self, id: Uuid) -> AppResult<Option<Pet>> {
        Ok(self.pets.iter().find(|p| p.id == id).cloned())
    }

    fn pets_by_ids(&mut self, ids: &[Uuid]) -> AppResult<Vec<Pet>> {
        Ok(self.pets.iter().filter(|p| ids.contains(&p.id)).cloned().collect())
    }

    fn pets_by_owner(&mut self, owner_id: Uuid) -> AppResult<Vec<Pet>> {
        let mut pets: Vec<Pet> = self.pets.iter().filter(|p| p.owner_id == owner_id).cloned().collect();
        newest_first(&mut pets, |p| (p.created_at, p.id));
        Ok(pets)
    }

    fn update_pet(&mut self, id: Uuid, changes: &PetChanges) -> AppResult<Pet> {
        let pet = self
            .pets
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| AppError::new(ErrorCode::PetNotFound, "pet not found"))?;
        changes.apply(pet, Utc::now());
        Ok(pet.clone())
    }

    fn delete_pet(&mut self, id: Uuid) -> AppResult<bool> {
        let before = self.pets.len();
        self.pets.retain(|p| p.id != id);
        if self.pets.len() == before {
            return Ok(false);
        }

        let dropped_matches: Vec<Uuid> = self
            .matches
            .iter()
            .filter(|m| m.has_pet(id))
            .map(|m| m.id)
            .collect();

        self.messages.retain(|m| !dropped_matches.contains(&m.match_id));
        self.matches.retain(|m| !m.has_pet(id));
        self.likes.retain(|l| l.from_pet_id != id && l.to_pet_id != id);
        self.passes.retain(|p| p.from_pet_id != id && p.to_pet_id != id);
        self.images.retain(|i| i.pet_id != id);
        for owner in self.owners.iter_mut().filter(|o| o.selected_pet_id == Some(id)) {
            owner.selected_pet_id = None;
            owner.updated_at = Utc::now();
        }
        Ok(true)
    }

    fn candidate_pool(&mut self, query: &CandidateQuery) -> AppResult<Vec<Pet>> {
        let mut pool: Vec<Pet> = self.pets.iter().filter(|p| query.admits(p)).cloned().collect();
        pool.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        pool.truncate(usize::try_from(query.pool_size).unwrap_or(0));
        Ok(pool)
    }

    fn insert_image(&mut self, image: PetImage) -> AppResult<PetImage> {
        self.images.push(image.clone());
        Ok(image)
    }

    fn images_for_pets(&mut self, pet_ids: &[Uuid]) -> AppResult<Vec<PetImage>> {
        let mut images: Vec<PetImage> = self.images.iter().filter(|i| pet_ids.contains(&i.pet_id)).cloned().collect();
        newest_first(&mut images, |i| (i.uploaded_at, i.id));
        Ok(images)
    }

    fn insert_like(&mut self, like: Like) -> AppResult<Option<Like>> {
        if self.like_exists(like.from_pet_id, like.to_pet_id)? {
            return Ok(None);
        }
        self.likes.push(like.clone());
        Ok(Some(like))
    }

    fn like_exists(&mut self, from_pet_id: Uuid, to_pet_id: Uuid) -> AppResult<bool> {
        Ok(self
            .likes
            .iter()
            .any(|l| l.from_pet_id == from_pet_id && l.to_pet_id == to_pet_id))
    }

    fn liked_targets(&mut self, from_pet_id: Uuid) -> AppResult<Vec<Uuid>> {
        Ok(self.likes.iter().filter(|l| l.from_pet_id == from_pet_id).map(|l| l.to_pet_id).collect())
    }

    fn insert_pass(&mut self, pass: Pass) -> AppResult<Option<Pass>> {
        if self.find_pass(pass.from_pet_id, pass.to_pet_id)?.is_some() {
            return Ok(None);
        }
        self.passes.push(pass.clone());
        Ok(Some(pass))
    }

    fn find_pass(&mut self, from_pet_id: Uuid, to_pet_id: Uuid) -> AppResult<Option<Pass>> {
        Ok(self
            .passes
            .iter()
            .find(|p| p.from_pet_id == from_pet_id && p.to_pet_id == to_pet_id)
            .cloned())
    }

    fn passed_targets(&mut self, from_pet_id: Uuid) -> AppResult<Vec<Uuid>> {
        Ok(self.passes.iter().filter(|p| p.from_pet_id == from_pet_id).map(|p| p.to_pet_id).collect())
    }

    fn lock_pair(&mut self, _pair: &PetPair) -> AppResult<()> {
        // The store lock already serializes whole transactions.
        Ok(())
    }

    fn insert_match(&mut self, record: Match) -> AppResult<Option<Match>> {
        if self.find_match_by_pair(&record.pair())?.is_some() {
            return Ok(None);
        }
        self.matches.push(record.clone());
        Ok(Some(record))
    }

    fn find_match(&mut self, id: Uuid) -> AppResult<Option<Match>> {
        Ok(self.matches.iter().find(|m| m.id == id).cloned())
    }

    fn find_match_by_pair(&mut self, pair: &PetPair) -> AppResult<Option<Match>> {
        Ok(self.matches.iter().find(|m| m.pair() == *pair).cloned())
    }

    fn matches_for_pets(&mut self, pet_ids: &[Uuid]) -> AppResult<Vec<Match>> {
        let mut found: Vec<Match> = self
            .matches
            .iter()
            .filter(|m| pet_ids.contains(&m.pet_lo_id) || pet_ids.contains(&m.pet_hi_id))
            .cloned()
            .collect();
        newest_first(&mut found, |m| (m.created_at, m.id));
        Ok(found)
    }

    fn insert_message(&mut self, message: Message) -> AppResult<Message> {
        self.messages.push(message.clone());
        Ok(message)
    }

    fn messages_for_match(&mut self, match_id: Uuid) -> AppResult<Vec<Message>> {
        // Insertion order is conversation order.
        Ok(self.messages.iter().filter(|m| m.match_id == match_id).cloned().collect())
    }

    fn last_message(&mut self, match_id: Uuid) -> AppResult<Option<Message>> {
        Ok(self.messages.iter().rev().find(|m| m.match_id == match_id).cloned())
    }

    fn mark_read_from(&mut self, match_id: Uuid, sender_pet_id: Uuid) -> AppResult<usize> {
        let mut flipped = 0;
        for message in self
            .messages
            .iter_mut()
            .filter(|m| m.match_id == match_id && m.sender_pet_id == sender_pet_id && !m.is_read)
        {
            message.is_read = true;
            flipped += 1;
        }
        Ok(flipped)
    }

    fn find_owner(&mut self, user_id: Uuid) -> AppResult<Option<Owner>> {
        Ok(self.owners.iter().find(|o| o.user_id == user_id).cloned())
    }

    fn set_selected_pet(&mut self, user_id: Uuid, pet_id: Uuid) -> AppResult<Owner> {
        let now = Utc::now();
        match self.owners.iter_mut().find(|o| o.user_id == user_id) {
            Some(owner) => {
                owner.selected_pet_id = Some(pet_id);
                owner.updated_at = now;
                Ok(owner.clone())
            }
            None => {
                let owner = Owner {
                    user_id,
                    selected_pet_id: Some(pet_id),
                    updated_at: now,
                };
                self.owners.push(owner.clone());
                Ok(owner)
            }
        }
    }
}
