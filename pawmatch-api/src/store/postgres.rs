use chrono::Utc;
use diesel::connection::SimpleConnection;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::sql_types::BigInt;
use uuid::Uuid;

use pawmatch_shared::clients::db::{create_pool, DbPool};
use pawmatch_shared::errors::{AppError, AppResult};

use super::{CandidateQuery, Repository, Store};
use crate::models::{Like, Match, Message, NewPet, Owner, Pass, Pet, PetChanges, PetImage, PetPair};
use crate::schema::{likes, matches, messages, owners, passes, pet_images, pets};

const SCHEMA_SQL: &str = include_str!("../../migrations/2026-10-01-000000_create_pawmatch/up.sql");

/// Postgres-backed store. Each transaction checks out one pooled connection.
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn connect(database_url: &str, pool_size: u32) -> AppResult<Self> {
        let pool = create_pool(database_url, pool_size).map_err(|e| AppError::internal(e.to_string()))?;
        Ok(Self::new(pool))
    }

    /// Applies the bundled schema. Every statement is idempotent.
    pub fn ensure_schema(&self) -> AppResult<()> {
        let mut conn = self.pool.get().map_err(|e| AppError::internal(e.to_string()))?;
        conn.batch_execute(SCHEMA_SQL)?;
        tracing::info!("database schema ensured");
        Ok(())
    }
}

impl Store for PgStore {
    fn transaction<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&mut dyn Repository) -> AppResult<T>,
    {
        let mut pooled = self.pool.get().map_err(|e| AppError::internal(e.to_string()))?;
        let conn: &mut PgConnection = &mut pooled;
        conn.transaction(|conn| {
            let mut repo = PgRepository { conn };
            f(&mut repo)
        })
    }
}

struct PgRepository<'c> {
    conn: &'c mut PgConnection,
}

impl Repository for PgRepository<'_> {
    fn insert_pet(&mut self, pet: NewPet) -> AppResult<Pet> {
        Ok(diesel::insert_into(pets::table)
            .values(&pet)
            .get_result::<Pet>(self.conn)?)
    }

    fn find_pet(&mut self, id: Uuid) -> AppResult<Option<Pet>> {
        Ok(pets::table.find(id).first::<Pet>(self.conn).optional()?)
    }

    fn pets_by_ids(&mut self, ids: &[Uuid]) -> AppResult<Vec<Pet>> {
        Ok(pets::table
            .filter(pets::id.eq_any(ids))
            .load::<Pet>(self.conn)?)
    }

    fn pets_by_owner(&mut self, owner_id: Uuid) -> AppResult<Vec<Pet>> {
        Ok(pets::table
            .filter(pets::owner_id.eq(owner_id))
            .order((pets::created_at.desc(), pets::id.desc()))
            .load::<Pet>(self.conn)?)
    }

    fn update_pet(&mut self, id: Uuid, changes: &PetChanges) -> AppResult<Pet> {
        Ok(diesel::update(pets::table.find(id))
            .set((changes, pets::updated_at.eq(Utc::now())))
            .get_result::<Pet>(self.conn)?)
    }

    fn delete_pet(&mut self, id: Uuid) -> AppResult<bool> {
        let match_ids: Vec<Uuid> = matches::table
            .filter(matches::pet_lo_id.eq(id).or(matches::pet_hi_id.eq(id)))
            .select(matches::id)
            .load::<Uuid>(self.conn)?;

        diesel::delete(messages::table.filter(messages::match_id.eq_any(&match_ids)))
            .execute(self.conn)?;
        diesel::delete(matches::table.filter(matches::id.eq_any(&match_ids)))
            .execute(self.conn)?;
        diesel::delete(likes::table.filter(likes::from_pet_id.eq(id).or(likes::to_pet_id.eq(id))))
            .execute(self.conn)?;
        diesel::delete(passes::table.filter(passes::from_pet_id.eq(id).or(passes::to_pet_id.eq(id))))
            .execute(self.conn)?;
        diesel::delete(pet_images::table.filter(pet_images::pet_id.eq(id)))
            .execute(self.conn)?;
        diesel::update(owners::table.filter(owners::selected_pet_id.eq(id)))
            .set((
                owners::selected_pet_id.eq(None::<Uuid>),
                owners::updated_at.eq(Utc::now()),
            ))
            .execute(self.conn)?;

        let deleted = diesel::delete(pets::table.find(id)).execute(self.conn)?;
        Ok(deleted > 0)
    }

    fn candidate_pool(&mut self, query: &CandidateQuery) -> AppResult<Vec<Pet>> {
        let mut statement = pets::table
            .filter(pets::pet_type.eq(query.pet_type))
            .filter(pets::is_active.eq(true))
            .filter(pets::owner_id.ne(query.owner_id))
            .filter(diesel::dsl::not(pets::id.eq_any(&query.excluded)))
            .into_boxed();

        if let Some(breed) = &query.breed {
            statement = statement.filter(pets::breed.eq(breed));
        }

        Ok(statement
            .order((pets::created_at.desc(), pets::id.asc()))
            .limit(query.pool_size)
            .load::<Pet>(self.conn)?)
    }

    fn insert_image(&mut self, image: PetImage) -> AppResult<PetImage> {
        Ok(diesel::insert_into(pet_images::table)
            .values(&image)
            .get_result::<PetImage>(self.conn)?)
    }

    fn images_for_pets(&mut self, pet_ids: &[Uuid]) -> AppResult<Vec<PetImage>> {
        Ok(pet_images::table
            .filter(pet_images::pet_id.eq_any(pet_ids))
            .order((pet_images::uploaded_at.desc(), pet_images::id.desc()))
            .load::<PetImage>(self.conn)?)
    }

    fn insert_like(&mut self, like: Like) -> AppResult<Option<Like>> {
        Ok(diesel::insert_into(likes::table)
            .values(&like)
            .on_conflict((likes::from_pet_id, likes::to_pet_id))
            .do_nothing()
            .get_result::<Like>(self.conn)
            .optional()?)
    }

    fn like_exists(&mut self, from_pet_id: Uuid, to_pet_id: Uuid) -> AppResult<bool> {
        Ok(diesel::select(diesel::dsl::exists(
            likes::table
                .filter(likes::from_pet_id.eq(from_pet_id))
                .filter(likes::to_pet_id.eq(to_pet_id)),
        ))
        .get_result::<bool>(self.conn)?)
    }

    fn liked_targets(&mut self, from_pet_id: Uuid) -> AppResult<Vec<Uuid>> {
        Ok(likes::table
            .filter(likes::from_pet_id.eq(from_pet_id))
            .select(likes::to_pet_id)
            .load::<Uuid>(self.conn)?)
    }

    fn insert_pass(&mut self, pass: Pass) -> AppResult<Option<Pass>> {
        Ok(diesel::insert_into(passes::table)
            .values(&pass)
            .on_conflict((passes::from_pet_id, passes::to_pet_id))
            .do_nothing()
            .get_result::<Pass>(self.conn)
            .optional()?)
    }

    fn find_pass(&mut self, from_pet_id: Uuid, to_pet_id: Uuid) -> AppResult<Option<Pass>> {
        Ok(passes::table
            .filter(passes::from_pet_id.eq(from_pet_id))
            .filter(passes::to_pet_id.eq(to_pet_id))
            .first::<Pass>(self.conn)
            .optional()?)
    }

    fn passed_targets(&mut self, from_pet_id: Uuid) -> AppResult<Vec<Uuid>> {
        Ok(passes::table
            .filter(passes::from_pet_id.eq(from_pet_id))
            .select(passes::to_pet_id)
            .load::<Uuid>(self.conn)?)
    }

    fn lock_pair(&mut self, pair: &PetPair) -> AppResult<()> {
        diesel::sql_query("SELECT pg_advisory_xact_lock($1)")
            .bind::<BigInt, _>(pair.lock_key())
            .execute(self.conn)?;
        Ok(())
    }

    fn insert_match(&mut self, record: Match) -> AppResult<Option<Match>> {
        Ok(diesel::insert_into(matches::table)
            .values(&record)
            .on_conflict((matches::pet_lo_id, matches::pet_hi_id))
            .do_nothing()
            .get_result::<Match>(self.conn)
            .optional()?)
    }

    fn find_match(&mut self, id: Uuid) -> AppResult<Option<Match>> {
        Ok(matches::table.find(id).first::<Match>(self.conn).optional()?)
    }

    fn find_match_by_pair(&mut self, pair: &PetPair) -> AppResult<Option<Match>> {
        Ok(matches::table
            .filter(matches::pet_lo_id.eq(pair.lo()))
            .filter(matches::pet_hi_id.eq(pair.hi()))
            .first::<Match>(self.conn)
            .optional()?)
    }

    fn matches_for_pets(&mut self, pet_ids: &[Uuid]) -> AppResult<Vec<Match>> {
        Ok(matches::table
            .filter(matches::pet_lo_id.eq_any(pet_ids).or(matches::pet_hi_id.eq_any(pet_ids)))
            .order((matches::created_at.desc(), matches::id.desc()))
            .load::<Match>(self.conn)?)
    }

    fn insert_message(&mut self, message: Message) -> AppResult<Message> {
        Ok(diesel::insert_into(messages::table)
            .values(&message)
            .get_result::<Message>(self.conn)?)
    }

    fn messages_for_match(&mut self, match_id: Uuid) -> AppResult<Vec<Message>> {
        Ok(messages::table
            .filter(messages::match_id.eq(match_id))
            .order((messages::created_at.asc(), messages::id.asc()))
            .load::<Message>(self.conn)?)
    }

    fn last_message(&mut self, match_id: Uuid) -> AppResult<Option<Message>> {
        Ok(messages::table
            .filter(messages::match_id.eq(match_id))
            .order((messages::created_at.desc(), messages::id.desc()))
            .first::<Message>(self.conn)
            .optional()?)
    }

    fn mark_read_from(&mut self, match_id: Uuid, sender_pet_id: Uuid) -> AppResult<usize> {
        Ok(diesel::update(
            messages::table
                .filter(messages::match_id.eq(match_id))
                .filter(messages::sender_pet_id.eq(sender_pet_id))
                .filter(messages::is_read.eq(false)),
        )
        .set(messages::is_read.eq(true))
        .execute(self.conn)?)
    }

    fn find_owner(&mut self, user_id: Uuid) -> AppResult<Option<Owner>> {
        Ok(owners::table.find(user_id).first::<Owner>(self.conn).optional()?)
    }

    fn set_selected_pet(&mut self, user_id: Uuid, pet_id: Uuid) -> AppResult<Owner> {
        let owner = Owner {
            user_id,
            selected_pet_id: Some(pet_id),
            updated_at: Utc::now(),
        };

        Ok(diesel::insert_into(owners::table)
            .values(&owner)
            .on_conflict(owners::user_id)
            .do_update()
            .set((
                owners::selected_pet_id.eq(owner.selected_pet_id),
                owners::updated_at.eq(owner.updated_at),
            ))
            .get_result::<Owner>(self.conn)?)
    }
}

// Live-database tests, run with:
//     DATABASE_URL=postgres://... cargo test -p pawmatch-api -- --ignored
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::thread;

    use pawmatch_shared::errors::ErrorCode;

    use crate::models::PetType;
    use crate::services::conversation::{mark_read, post_message};
    use crate::services::interactions::{record_like, LikeOutcome};
    use crate::services::testing::draft;

    fn live_store() -> PgStore {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL not set");
        let store = PgStore::connect(&url, 4).unwrap();
        store.ensure_schema().unwrap();
        store
    }

    fn insert_pet(store: &PgStore, owner_id: Uuid, name: &str) -> Pet {
        let (new_pet, _) = draft(name, PetType::Dog, "beagle").into_new_pet(owner_id);
        store.transaction(|repo| repo.insert_pet(new_pet)).unwrap()
    }

    fn remove_pets(store: &PgStore, pets: &[&Pet]) {
        for pet in pets {
            store.transaction(|repo| repo.delete_pet(pet.id)).unwrap();
        }
    }

    #[test]
    #[ignore]
    fn concurrent_reciprocal_likes_form_one_match() {
        let store = Arc::new(live_store());

        for _ in 0..10 {
            let (alice, bob) = (Uuid::now_v7(), Uuid::now_v7());
            let a = insert_pet(&store, alice, "Rex");
            let b = insert_pet(&store, bob, "Fido");
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

            let matches = store.transaction(|repo| repo.matches_for_pets(&[a.id])).unwrap();
            assert_eq!(matches.len(), 1);
            assert_eq!(matches[0].pet_lo_id, a.id.min(b.id));

            remove_pets(&store, &[&a, &b]);
        }
    }

    #[test]
    #[ignore]
    fn duplicate_rows_are_not_inserted() {
        let store = live_store();
        let (alice, bob) = (Uuid::now_v7(), Uuid::now_v7());
        let a = insert_pet(&store, alice, "Rex");
        let b = insert_pet(&store, bob, "Fido");

        record_like(&store, alice, a.id, b.id).unwrap();
        let err = record_like(&store, alice, a.id, b.id).unwrap_err();
        assert_eq!(err.code(), ErrorCode::DuplicateInteraction);

        let pair = PetPair::new(a.id, b.id).unwrap();
        let first = store.transaction(|repo| repo.insert_match(Match::new(&pair))).unwrap();
        let second = store.transaction(|repo| repo.insert_match(Match::new(&pair))).unwrap();
        assert!(first.is_some());
        assert!(second.is_none());

        let missing = store
            .transaction(|repo| repo.update_pet(Uuid::now_v7(), &PetChanges::default()))
            .unwrap_err();
        assert_eq!(missing.code(), ErrorCode::NotFound);

        remove_pets(&store, &[&a, &b]);
    }

    #[test]
    #[ignore]
    fn mark_read_flips_each_message_once() {
        let store = live_store();
        let (alice, bob) = (Uuid::now_v7(), Uuid::now_v7());
        let a = insert_pet(&store, alice, "Rex");
        let b = insert_pet(&store, bob, "Fido");

        record_like(&store, alice, a.id, b.id).unwrap();
        let record = record_like(&store, bob, b.id, a.id).unwrap().matched.unwrap();
        post_message(&store, bob, record.id, b.id, "hi Rex").unwrap();
        post_message(&store, alice, record.id, a.id, "hi Fido").unwrap();

        assert_eq!(mark_read(&store, alice, record.id).unwrap(), 1);
        assert_eq!(mark_read(&store, alice, record.id).unwrap(), 0);

        remove_pets(&store, &[&a, &b]);
        let gone = store.transaction(|repo| repo.messages_for_match(record.id)).unwrap();
        assert!(gone.is_empty());
    }
}
