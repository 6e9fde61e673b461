//! Builders shared by the service tests.

use uuid::Uuid;

use crate::config::DiscoveryConfig;
use crate::models::{Gender, Pet, PetDraft, PetType};
use crate::store::{MemoryStore, Repository, Store};

pub struct Fixture {
    pub store: MemoryStore,
    pub discovery: DiscoveryConfig,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            store: MemoryStore::new(),
            discovery: DiscoveryConfig::default(),
        }
    }
}

pub fn draft(name: &str, pet_type: PetType, breed: &str) -> PetDraft {
    PetDraft {
        name: name.to_string(),
        pet_type,
        breed: breed.to_string(),
        age: 3,
        gender: Gender::Male,
        bio: format!("{name} loves walks"),
        primary_image: None,
        additional_images: vec![],
    }
}

pub fn seed_pet(store: &MemoryStore, owner_id: Uuid, name: &str) -> Pet {
    seed_pet_with(store, owner_id, draft(name, PetType::Dog, "beagle"))
}

pub fn seed_pet_with(store: &MemoryStore, owner_id: Uuid, draft: PetDraft) -> Pet {
    let (new_pet, _) = draft.into_new_pet(owner_id);
    store.transaction(|repo| repo.insert_pet(new_pet)).unwrap()
}

pub fn pets_of(repo: &mut dyn Repository, owner_id: Uuid) -> Vec<Uuid> {
    repo.pets_by_owner(owner_id).unwrap().into_iter().map(|p| p.id).collect()
}
