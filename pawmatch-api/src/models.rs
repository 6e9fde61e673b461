use std::fmt;
use std::io::Write;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::prelude::*;
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::schema::{likes, matches, messages, owners, passes, pet_images, pets};

/// Stores a string-backed enum in a VARCHAR column.
macro_rules! text_enum_sql {
    ($ty:ty) => {
        impl ToSql<Text, Pg> for $ty {
            fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
                out.write_all(self.as_str().as_bytes())?;
                Ok(IsNull::No)
            }
        }

        impl FromSql<Text, Pg> for $ty {
            fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
                let raw = std::str::from_utf8(bytes.as_bytes())?;
                raw.parse::<$ty>().map_err(Into::into)
            }
        }
    };
}

// --- PetType ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum PetType {
    Dog,
    Cat,
    Bird,
    Rabbit,
    Other,
}

impl PetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PetType::Dog => "dog",
            PetType::Cat => "cat",
            PetType::Bird => "bird",
            PetType::Rabbit => "rabbit",
            PetType::Other => "other",
        }
    }
}

impl fmt::Display for PetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dog" => Ok(PetType::Dog),
            "cat" => Ok(PetType::Cat),
            "bird" => Ok(PetType::Bird),
            "rabbit" => Ok(PetType::Rabbit),
            "other" => Ok(PetType::Other),
            _ => Err(format!("unknown pet type: {s}")),
        }
    }
}

text_enum_sql!(PetType);

// --- Gender ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            _ => Err(format!("unknown gender: {s}")),
        }
    }
}

text_enum_sql!(Gender);

// --- Pet ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone, PartialEq)]
#[diesel(table_name = pets)]
pub struct Pet {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub pet_type: PetType,
    pub breed: String,
    pub age: i32,
    pub gender: Gender,
    pub bio: String,
    pub primary_image: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable, Clone)]
#[diesel(table_name = pets)]
pub struct NewPet {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub pet_type: PetType,
    pub breed: String,
    pub age: i32,
    pub gender: Gender,
    pub bio: String,
    pub primary_image: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewPet {
    pub fn into_pet(self) -> Pet {
        Pet {
            id: self.id,
            owner_id: self.owner_id,
            name: self.name,
            pet_type: self.pet_type,
            breed: self.breed,
            age: self.age,
            gender: self.gender,
            bio: self.bio,
            primary_image: self.primary_image,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Registration payload for a new pet.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PetDraft {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
    pub pet_type: PetType,
    #[validate(length(min = 1, max = 100, message = "breed must be 1-100 characters"))]
    pub breed: String,
    #[validate(range(min = 0, message = "age cannot be negative"))]
    pub age: i32,
    pub gender: Gender,
    #[serde(default)]
    #[validate(length(max = 500, message = "bio must be at most 500 characters"))]
    pub bio: String,
    #[validate(url(message = "primary_image must be a URL"))]
    pub primary_image: Option<String>,
    #[serde(default)]
    pub additional_images: Vec<String>,
}

impl PetDraft {
    pub fn into_new_pet(self, owner_id: Uuid) -> (NewPet, Vec<String>) {
        let now = Utc::now();
        let pet = NewPet {
            id: Uuid::now_v7(),
            owner_id,
            name: self.name.trim().to_string(),
            pet_type: self.pet_type,
            breed: self.breed.trim().to_string(),
            age: self.age,
            gender: self.gender,
            bio: self.bio,
            primary_image: self.primary_image,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        (pet, self.additional_images)
    }
}

/// Partial update of a pet. Absent fields are left untouched.
#[derive(Debug, Clone, AsChangeset, Deserialize, Default, Validate)]
#[diesel(table_name = pets)]
pub struct PetChanges {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: Option<String>,
    pub pet_type: Option<PetType>,
    #[validate(length(min = 1, max = 100, message = "breed must be 1-100 characters"))]
    pub breed: Option<String>,
    #[validate(range(min = 0, message = "age cannot be negative"))]
    pub age: Option<i32>,
    pub gender: Option<Gender>,
    #[validate(length(max = 500, message = "bio must be at most 500 characters"))]
    pub bio: Option<String>,
    #[validate(url(message = "primary_image must be a URL"))]
    pub primary_image: Option<String>,
    pub is_active: Option<bool>,
}

impl PetChanges {
    pub fn apply(&self, pet: &mut Pet, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            pet.name = name.clone();
        }
        if let Some(pet_type) = self.pet_type {
            pet.pet_type = pet_type;
        }
        if let Some(breed) = &self.breed {
            pet.breed = breed.clone();
        }
        if let Some(age) = self.age {
            pet.age = age;
        }
        if let Some(gender) = self.gender {
            pet.gender = gender;
        }
        if let Some(bio) = &self.bio {
            pet.bio = bio.clone();
        }
        if let Some(image) = &self.primary_image {
            pet.primary_image = Some(image.clone());
        }
        if let Some(active) = self.is_active {
            pet.is_active = active;
        }
        pet.updated_at = now;
    }
}

// --- PetImage ---

#[derive(Debug, Queryable, Identifiable, Insertable, Serialize, Clone, PartialEq)]
#[diesel(table_name = pet_images)]
pub struct PetImage {
    pub id: Uuid,
    pub pet_id: Uuid,
    pub image_url: String,
    pub uploaded_at: DateTime<Utc>,
}

impl PetImage {
    pub fn new(pet_id: Uuid, image_url: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            pet_id,
            image_url: image_url.into(),
            uploaded_at: Utc::now(),
        }
    }
}

// --- Like / Pass ---

#[derive(Debug, Queryable, Identifiable, Insertable, Serialize, Clone, PartialEq)]
#[diesel(table_name = likes)]
pub struct Like {
    pub id: Uuid,
    pub from_pet_id: Uuid,
    pub to_pet_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Like {
    pub fn new(from_pet_id: Uuid, to_pet_id: Uuid) -> Self {
        Self {
            id: Uuid::now_v7(),
            from_pet_id,
            to_pet_id,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Queryable, Identifiable, Insertable, Serialize, Clone, PartialEq)]
#[diesel(table_name = passes)]
pub struct Pass {
    pub id: Uuid,
    pub from_pet_id: Uuid,
    pub to_pet_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Pass {
    pub fn new(from_pet_id: Uuid, to_pet_id: Uuid) -> Self {
        Self {
            id: Uuid::now_v7(),
            from_pet_id,
            to_pet_id,
            created_at: Utc::now(),
        }
    }
}

// --- Match ---

/// Unordered pair of distinct pets, stored as (lo, hi).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PetPair {
    lo: Uuid,
    hi: Uuid,
}

impl PetPair {
    /// `None` when both ids are the same pet.
    pub fn new(a: Uuid, b: Uuid) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { lo: a, hi: b }),
            std::cmp::Ordering::Greater => Some(Self { lo: b, hi: a }),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn lo(&self) -> Uuid {
        self.lo
    }

    pub fn hi(&self) -> Uuid {
        self.hi
    }

    /// Key for store-level pair locks. Collisions only cost extra serialization.
    pub fn lock_key(&self) -> i64 {
        let mixed = self.lo.as_u128() ^ self.hi.as_u128().rotate_left(41);
        ((mixed as u64) ^ ((mixed >> 64) as u64)) as i64
    }
}

#[derive(Debug, Queryable, Identifiable, Insertable, Serialize, Clone, PartialEq)]
#[diesel(table_name = matches)]
pub struct Match {
    pub id: Uuid,
    pub pet_lo_id: Uuid,
    pub pet_hi_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Match {
    pub fn new(pair: &PetPair) -> Self {
        Self {
            id: Uuid::now_v7(),
            pet_lo_id: pair.lo(),
            pet_hi_id: pair.hi(),
            created_at: Utc::now(),
        }
    }

    pub fn pair(&self) -> PetPair {
        PetPair {
            lo: self.pet_lo_id,
            hi: self.pet_hi_id,
        }
    }

    pub fn has_pet(&self, pet_id: Uuid) -> bool {
        self.pet_lo_id == pet_id || self.pet_hi_id == pet_id
    }

    /// The counterpart of `pet_id`, or `None` if it is not a member.
    pub fn other_pet(&self, pet_id: Uuid) -> Option<Uuid> {
        if pet_id == self.pet_lo_id {
            Some(self.pet_hi_id)
        } else if pet_id == self.pet_hi_id {
            Some(self.pet_lo_id)
        } else {
            None
        }
    }
}

// --- Message ---

#[derive(Debug, Queryable, Identifiable, Insertable, Serialize, Clone, PartialEq)]
#[diesel(table_name = messages)]
pub struct Message {
    pub id: Uuid,
    pub match_id: Uuid,
    pub sender_pet_id: Uuid,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(match_id: Uuid, sender_pet_id: Uuid, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            match_id,
            sender_pet_id,
            content: content.into(),
            is_read: false,
            created_at: Utc::now(),
        }
    }
}

// --- Owner ---

#[derive(Debug, Queryable, Identifiable, Insertable, Serialize, Clone, PartialEq)]
#[diesel(table_name = owners, primary_key(user_id))]
pub struct Owner {
    pub user_id: Uuid,
    pub selected_pet_id: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

impl Owner {
    pub fn unselected(user_id: Uuid) -> Self {
        Self {
            user_id,
            selected_pet_id: None,
            updated_at: Utc::now(),
        }
    }
}
