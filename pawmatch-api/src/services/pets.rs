//! Pet registration, profile edits, images and the owner's selected pet.

use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use pawmatch_shared::errors::{AppError, AppResult};

use crate::models::{Owner, PetChanges, PetDraft, PetImage};
use crate::services::access;
use crate::services::views::{pet_view_of, pet_views, PetView};
use crate::store::Store;

#[derive(Debug, Clone, Serialize)]
pub struct OwnerProfile {
    pub user_id: Uuid,
    pub selected_pet_id: Option<Uuid>,
    pub selected_pet: Option<PetView>,
    pub pet_count: usize,
}

fn check_image_url(url: &str) -> AppResult<()> {
    if !validator::validate_url(url) {
        return Err(AppError::validation(format!("invalid image url: {url}")));
    }
    Ok(())
}

/// Trimmed text for a field that must not be blank.
fn required_text(field: &str, value: &str) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::validation(format!("{field} cannot be blank")));
    }
    Ok(value.to_string())
}

fn validated<T: Validate>(payload: &T) -> AppResult<()> {
    payload
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))
}

/// Registers a pet with its extra images. The first pet an owner registers becomes their selection.
pub fn create_pet<S: Store>(store: &S, user_id: Uuid, mut draft: PetDraft) -> AppResult<PetView> {
    validated(&draft)?;
    draft.name = required_text("name", &draft.name)?;
    draft.breed = required_text("breed", &draft.breed)?;
    for url in &draft.additional_images {
        check_image_url(url)?;
    }

    let (new_pet, image_urls) = draft.into_new_pet(user_id);
    store.transaction(|repo| {
        let pet = repo.insert_pet(new_pet)?;
        for url in image_urls {
            repo.insert_image(PetImage::new(pet.id, url))?;
        }

        let has_selection = repo
            .find_owner(user_id)?
            .is_some_and(|o| o.selected_pet_id.is_some());
        if !has_selection {
            repo.set_selected_pet(user_id, pet.id)?;
        }

        pet_view_of(repo, pet)
    })
}

/// Applies the present fields. Name and breed follow the same rules as at registration.
pub fn update_pet<S: Store>(store: &S, user_id: Uuid, pet_id: Uuid, mut changes: PetChanges) -> AppResult<PetView> {
    validated(&changes)?;
    changes.name = changes.name.as_deref().map(|n| required_text("name", n)).transpose()?;
    changes.breed = changes.breed.as_deref().map(|b| required_text("breed", b)).transpose()?;

    store.transaction(|repo| {
        access::owned_pet(repo, user_id, pet_id)?;
        let pet = repo.update_pet(pet_id, &changes)?;
        pet_view_of(repo, pet)
    })
}

/// Deletes the pet with its images, interactions, matches and their messages.
pub fn delete_pet<S: Store>(store: &S, user_id: Uuid, pet_id: Uuid) -> AppResult<()> {
    store.transaction(|repo| {
        access::owned_pet(repo, user_id, pet_id)?;
        if !repo.delete_pet(pet_id)? {
            return Err(AppError::internal("pet vanished during delete"));
        }
        Ok(())
    })
}

pub fn add_image<S: Store>(store: &S, user_id: Uuid, pet_id: Uuid, image_url: &str) -> AppResult<PetImage> {
    let image_url = image_url.trim();
    check_image_url(image_url)?;

    store.transaction(|repo| {
        access::owned_pet(repo, user_id, pet_id)?;
        repo.insert_image(PetImage::new(pet_id, image_url))
    })
}

/// Newest first. Visible to the owner and to owners of matched pets.
pub fn list_images<S: Store>(store: &S, user_id: Uuid, pet_id: Uuid) -> AppResult<Vec<PetImage>> {
    store.transaction(|repo| {
        let pet = access::viewable_pet(repo, user_id, pet_id)?;
        repo.images_for_pets(&[pet.id])
    })
}

pub fn select_pet<S: Store>(store: &S, user_id: Uuid, pet_id: Uuid) -> AppResult<Owner> {
    store.transaction(|repo| {
        access::owned_pet(repo, user_id, pet_id)?;
        repo.set_selected_pet(user_id, pet_id)
    })
}

pub fn owner_profile<S: Store>(store: &S, user_id: Uuid) -> AppResult<OwnerProfile> {
    store.transaction(|repo| {
        let owner = repo.find_owner(user_id)?.unwrap_or_else(|| Owner::unselected(user_id));
        let pet_count = repo.pets_by_owner(user_id)?.len();

        let selected_pet = match owner.selected_pet_id {
            Some(id) => match repo.find_pet(id)? {
                Some(pet) => Some(pet_view_of(repo, pet)?),
                None => None,
            },
            None => None,
        };

        Ok(OwnerProfile {
            user_id,
            selected_pet_id: owner.selected_pet_id,
            selected_pet,
            pet_count,
        })
    })
}

/// The caller's pets, newest first.
pub fn list_own_pets<S: Store>(store: &S, user_id: Uuid) -> AppResult<Vec<PetView>> {
    store.transaction(|repo| {
        let pets = repo.pets_by_owner(user_id)?;
        pet_views(repo, pets)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pawmatch_shared::errors::ErrorCode;

    use crate::models::PetType;
    use crate::services::conversation::post_message;
    use crate::services::discovery::{discover, DiscoverRequest};
    use crate::services::interactions::{record_like, record_pass};
    use crate::services::testing::{draft, pets_of, seed_pet, seed_pet_with, Fixture};

    #[test]
    fn first_pet_becomes_selected() {
        let fx = Fixture::new();
        let alice = Uuid::now_v7();

        let mut first = draft("Rex", PetType::Dog, "beagle");
        first.additional_images = vec!["https://img.example/rex.jpg".into()];
        let rex = create_pet(&fx.store, alice, first).unwrap();
        let mochi = create_pet(&fx.store, alice, draft("Mochi", PetType::Cat, "ragdoll")).unwrap();

        assert_eq!(rex.images.len(), 1);
        assert_eq!(rex.primary_image_url.as_deref(), Some("https://img.example/rex.jpg"));

        let profile = owner_profile(&fx.store, alice).unwrap();
        assert_eq!(profile.selected_pet_id, Some(rex.pet.id));
        assert_eq!(profile.pet_count, 2);

        select_pet(&fx.store, alice, mochi.pet.id).unwrap();
        let profile = owner_profile(&fx.store, alice).unwrap();
        assert_eq!(profile.selected_pet.unwrap().pet.name, "Mochi");

        let own: Vec<Uuid> = list_own_pets(&fx.store, alice).unwrap().iter().map(|v| v.pet.id).collect();
        assert_eq!(own.len(), 2);
        assert!(own.contains(&rex.pet.id) && own.contains(&mochi.pet.id));
    }

    #[test]
    fn invalid_drafts_store_nothing() {
        let fx = Fixture::new();
        let alice = Uuid::now_v7();

        let mut bad = draft("Rex", PetType::Dog, "beagle");
        bad.additional_images = vec!["not a url".into()];
        let err = create_pet(&fx.store, alice, bad).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let err = create_pet(&fx.store, alice, draft("   ", PetType::Dog, "beagle")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        assert!(list_own_pets(&fx.store, alice).unwrap().is_empty());
        assert!(owner_profile(&fx.store, alice).unwrap().selected_pet_id.is_none());
    }

    #[test]
    fn only_the_owner_edits() {
        let fx = Fixture::new();
        let (alice, bob) = (Uuid::now_v7(), Uuid::now_v7());
        let rex = seed_pet(&fx.store, alice, "Rex");

        let changes = PetChanges {
            bio: Some("retired".into()),
            ..Default::default()
        };
        let err = update_pet(&fx.store, bob, rex.id, changes.clone()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);

        let updated = update_pet(&fx.store, alice, rex.id, changes).unwrap();
        assert_eq!(updated.pet.bio, "retired");
        assert!(updated.pet.updated_at >= rex.updated_at);

        let err = add_image(&fx.store, bob, rex.id, "https://img.example/x.jpg").unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);
        let err = add_image(&fx.store, alice, rex.id, "not-a-url").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let err = select_pet(&fx.store, bob, rex.id).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);
        let err = delete_pet(&fx.store, bob, rex.id).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }

    #[test]
    fn edits_trim_and_reject_blank_text() {
        let mut fx = Fixture::new();
        let (alice, bob) = (Uuid::now_v7(), Uuid::now_v7());
        let rex = seed_pet(&fx.store, alice, "Rex");
        let fido = seed_pet_with(&fx.store, bob, draft("Fido", PetType::Dog, "poodle"));

        let blank = PetChanges {
            name: Some("   ".into()),
            breed: Some("  ".into()),
            ..Default::default()
        };
        let err = update_pet(&fx.store, bob, fido.id, blank).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let padded = PetChanges {
            name: Some("  Fido II ".into()),
            breed: Some("beagle ".into()),
            ..Default::default()
        };
        let updated = update_pet(&fx.store, bob, fido.id, padded).unwrap();
        assert_eq!(updated.pet.name, "Fido II");
        assert_eq!(updated.pet.breed, "beagle");

        fx.discovery.same_breed = true;
        let request = DiscoverRequest {
            pet_id: Some(rex.id),
            ..Default::default()
        };
        let found = discover(&fx.store, &fx.discovery, alice, request).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].pet.id, fido.id);
    }

    #[test]
    fn images_are_visible_to_matched_owners() {
        let fx = Fixture::new();
        let (alice, bob) = (Uuid::now_v7(), Uuid::now_v7());
        let rex = seed_pet(&fx.store, alice, "Rex");
        let fido = seed_pet(&fx.store, bob, "Fido");
        add_image(&fx.store, alice, rex.id, "https://img.example/rex.jpg").unwrap();

        let err = list_images(&fx.store, bob, rex.id).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);

        record_like(&fx.store, alice, rex.id, fido.id).unwrap();
        record_like(&fx.store, bob, fido.id, rex.id).unwrap();

        let images = list_images(&fx.store, bob, rex.id).unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].pet_id, rex.id);
    }

    #[test]
    fn delete_cascades_everything() {
        let fx = Fixture::new();
        let (alice, bob) = (Uuid::now_v7(), Uuid::now_v7());
        let rex = seed_pet(&fx.store, alice, "Rex");
        let fido = seed_pet(&fx.store, bob, "Fido");
        let spot = seed_pet(&fx.store, bob, "Spot");

        select_pet(&fx.store, alice, rex.id).unwrap();
        add_image(&fx.store, alice, rex.id, "https://img.example/rex.jpg").unwrap();
        record_like(&fx.store, alice, rex.id, fido.id).unwrap();
        let record = record_like(&fx.store, bob, fido.id, rex.id).unwrap().matched.unwrap();
        record_pass(&fx.store, bob, spot.id, rex.id).unwrap();
        post_message(&fx.store, bob, record.id, fido.id, "hi").unwrap();

        delete_pet(&fx.store, alice, rex.id).unwrap();

        fx.store
            .transaction(|repo| {
                assert!(repo.find_pet(rex.id)?.is_none());
                assert!(pets_of(repo, alice).is_empty());
                assert!(repo.images_for_pets(&[rex.id])?.is_empty());
                assert!(repo.liked_targets(fido.id)?.is_empty());
                assert!(repo.liked_targets(rex.id)?.is_empty());
                assert!(repo.passed_targets(spot.id)?.is_empty());
                assert!(repo.find_match(record.id)?.is_none());
                assert!(repo.messages_for_match(record.id)?.is_empty());
                assert_eq!(repo.find_owner(alice)?.unwrap().selected_pet_id, None);
                Ok(())
            })
            .unwrap();

        let err = delete_pet(&fx.store, alice, rex.id).unwrap_err();
        assert_eq!(err.code(), ErrorCode::PetNotFound);
    }
}
