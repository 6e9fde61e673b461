//! Likes, passes, and match creation.

use serde::Serialize;
use uuid::Uuid;

use pawmatch_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{Like, Match, Pass, PetPair};
use crate::services::access;
use crate::store::{retry_on_conflict, Repository, Store};

#[derive(Debug, Clone, Serialize)]
pub struct LikeOutcome {
    pub like: Like,
    pub is_match: bool,
    #[serde(rename = "match")]
    pub matched: Option<Match>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PassOutcome {
    pub pass: Pass,
    /// False when an earlier identical pass was returned.
    pub created: bool,
}

fn distinct_pair(from_pet: Uuid, to_pet: Uuid, verb: &str) -> AppResult<PetPair> {
    PetPair::new(from_pet, to_pet)
        .ok_or_else(|| AppError::validation(format!("a pet cannot {verb} itself")))
}

/// Records `from_pet -> to_pet` and forms the match when the reverse like exists.
pub fn record_like<S: Store>(store: &S, user_id: Uuid, from_pet: Uuid, to_pet: Uuid) -> AppResult<LikeOutcome> {
    let pair = distinct_pair(from_pet, to_pet, "like")?;

    let outcome = retry_on_conflict(|| {
        store.transaction(|repo| {
            access::owned_pet(repo, user_id, from_pet)?;
            access::existing_pet(repo, to_pet)?;

            // Reciprocal likes on the same pair run one after the other from here on.
            repo.lock_pair(&pair)?;

            let like = repo
                .insert_like(Like::new(from_pet, to_pet))?
                .ok_or_else(|| AppError::new(ErrorCode::DuplicateInteraction, "like already exists"))?;

            let matched = if repo.like_exists(to_pet, from_pet)? {
                Some(get_or_create_match(repo, &pair)?)
            } else {
                None
            };

            Ok(LikeOutcome {
                like,
                is_match: matched.is_some(),
                matched,
            })
        })
    })?;

    metrics::counter!("pawmatch_likes_total").increment(1);
    if outcome.is_match {
        metrics::counter!("pawmatch_matches_total").increment(1);
    }
    Ok(outcome)
}

/// Fetches the canonical match for `pair`, inserting it if absent.
///
/// An insert that loses a race reports `ConflictRetryable`; the caller's
/// transaction is rerun and the fetch then finds the winner's row.
pub fn get_or_create_match(repo: &mut dyn Repository, pair: &PetPair) -> AppResult<Match> {
    if let Some(existing) = repo.find_match_by_pair(pair)? {
        return Ok(existing);
    }

    if let Some(created) = repo.insert_match(Match::new(pair))? {
        return Ok(created);
    }

    repo.find_match_by_pair(pair)?
        .ok_or_else(|| AppError::conflict_retryable("match insert lost a race"))
}

/// Records `from_pet -> to_pet` as passed. Repeating a pass returns the first one.
pub fn record_pass<S: Store>(store: &S, user_id: Uuid, from_pet: Uuid, to_pet: Uuid) -> AppResult<PassOutcome> {
    distinct_pair(from_pet, to_pet, "pass")?;

    let outcome = retry_on_conflict(|| {
        store.transaction(|repo| {
            access::owned_pet(repo, user_id, from_pet)?;
            access::existing_pet(repo, to_pet)?;

            if let Some(existing) = repo.find_pass(from_pet, to_pet)? {
                return Ok(PassOutcome { pass: existing, created: false });
            }

            match repo.insert_pass(Pass::new(from_pet, to_pet))? {
                Some(pass) => Ok(PassOutcome { pass, created: true }),
                None => Err(AppError::conflict_retryable("pass insert lost a race")),
            }
        })
    })?;

    if outcome.created {
        metrics::counter!("pawmatch_passes_total").increment(1);
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::thread;

    use crate::services::testing::{seed_pet, Fixture};
    use crate::store::MemoryStore;

    fn match_count(store: &MemoryStore, pet_id: Uuid) -> usize {
        store.transaction(|repo| repo.matches_for_pets(&[pet_id])).unwrap().len()
    }

    #[test]
    fn mutual_like_creates_canonical_match() {
        let fx = Fixture::new();
        let (alice, bob) = (Uuid::now_v7(), Uuid::now_v7());
        let a = seed_pet(&fx.store, alice, "Rex");
        let b = seed_pet(&fx.store, bob, "Fido");

        let first = record_like(&fx.store, alice, a.id, b.id).unwrap();
        assert!(!first.is_match);
        assert!(first.matched.is_none());

        let second = record_like(&fx.store, bob, b.id, a.id).unwrap();
        let matched = second.matched.expect("reciprocal like should match");
        assert!(second.is_match);
        assert_eq!(matched.pet_lo_id, a.id.min(b.id));
        assert_eq!(matched.pet_hi_id, a.id.max(b.id));
        assert_eq!(match_count(&fx.store, a.id), 1);
    }

    #[test]
    fn repeated_like_is_rejected_without_new_rows() {
        let fx = Fixture::new();
        let (alice, bob) = (Uuid::now_v7(), Uuid::now_v7());
        let a = seed_pet(&fx.store, alice, "Rex");
        let b = seed_pet(&fx.store, bob, "Fido");

        record_like(&fx.store, alice, a.id, b.id).unwrap();
        record_like(&fx.store, bob, b.id, a.id).unwrap();

        let err = record_like(&fx.store, bob, b.id, a.id).unwrap_err();
        assert_eq!(err.code(), ErrorCode::DuplicateInteraction);
        let err = record_like(&fx.store, alice, a.id, b.id).unwrap_err();
        assert_eq!(err.code(), ErrorCode::DuplicateInteraction);

        let liked = fx.store.transaction(|repo| repo.liked_targets(b.id)).unwrap();
        assert_eq!(liked, vec![a.id]);
        assert_eq!(match_count(&fx.store, a.id), 1);
    }

    #[test]
    fn like_preconditions() {
        let fx = Fixture::new();
        let (alice, bob) = (Uuid::now_v7(), Uuid::now_v7());
        let a = seed_pet(&fx.store, alice, "Rex");
        let b = seed_pet(&fx.store, bob, "Fido");

        let err = record_like(&fx.store, alice, a.id, a.id).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let err = record_like(&fx.store, bob, a.id, b.id).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);

        let err = record_like(&fx.store, alice, a.id, Uuid::now_v7()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::PetNotFound);

        let err = record_like(&fx.store, alice, Uuid::now_v7(), b.id).unwrap_err();
        assert_eq!(err.code(), ErrorCode::PetNotFound);

        assert!(fx.store.transaction(|repo| repo.liked_targets(a.id)).unwrap().is_empty());
    }

    #[test]
    fn pass_is_idempotent() {
        let fx = Fixture::new();
        let (alice, bob) = (Uuid::now_v7(), Uuid::now_v7());
        let a = seed_pet(&fx.store, alice, "Rex");
        let b = seed_pet(&fx.store, bob, "Fido");

        let first = record_pass(&fx.store, alice, a.id, b.id).unwrap();
        let second = record_pass(&fx.store, alice, a.id, b.id).unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.pass.id, second.pass.id);
        assert_eq!(fx.store.transaction(|repo| repo.passed_targets(a.id)).unwrap().len(), 1);

        let err = record_pass(&fx.store, bob, a.id, b.id).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }

    #[test]
    fn pass_then_like_without_reciprocal_never_matches() {
        let fx = Fixture::new();
        let (alice, bob) = (Uuid::now_v7(), Uuid::now_v7());
        let a = seed_pet(&fx.store, alice, "Rex");
        let b = seed_pet(&fx.store, bob, "Fido");

        record_pass(&fx.store, alice, a.id, b.id).unwrap();
        let outcome = record_like(&fx.store, alice, a.id, b.id).unwrap();

        assert!(outcome.matched.is_none());
        assert_eq!(fx.store.transaction(|repo| repo.liked_targets(a.id)).unwrap(), vec![b.id]);
        assert_eq!(fx.store.transaction(|repo| repo.passed_targets(a.id)).unwrap(), vec![b.id]);
        assert_eq!(match_count(&fx.store, a.id), 0);
    }

    #[test]
    fn get_or_create_returns_existing_match() {
        let fx = Fixture::new();
        let a = seed_pet(&fx.store, Uuid::now_v7(), "Rex");
        let b = seed_pet(&fx.store, Uuid::now_v7(), "Fido");
        let pair = PetPair::new(a.id, b.id).unwrap();

        let (first, second) = fx
            .store
            .transaction(|repo| Ok((get_or_create_match(repo, &pair)?, get_or_create_match(repo, &pair)?)))
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(match_count(&fx.store, a.id), 1);
    }

    #[test]
    fn concurrent_reciprocal_likes_form_one_match() {
        for _ in 0..20 {
            let store = Arc::new(MemoryStore::new());
            let (alice, bob) = (Uuid::now_v7(), Uuid::now_v7());
            let a = seed_pet(&store, alice, "Rex");
            let b = seed_pet(&store, bob, "Fido");
            let barrier = Arc::new(Barrier::new(2));

            let handles: Vec<_> = [(alice, a.id, b.id), (bob, b.id, a.id)]
                .into_iter()
                .map(|(user, from, to)| {
                    let store = Arc::clone(&store);
                    let barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        barrier.wait();
                        record_like(store.as_ref(), user, from, to).unwrap()
                    })
                })
                .collect();

            let outcomes: Vec<LikeOutcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();

            assert_eq!(outcomes.iter().filter(|o| o.is_match).count(), 1);
            assert_eq!(match_count(&store, a.id), 1);
        }
    }
}
