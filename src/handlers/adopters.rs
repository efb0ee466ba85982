use actix_web::{get, post, put, web, HttpResponse};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use bson::{doc, Bson, DateTime as BsonDateTime};
use futures::TryStreamExt;
use mongodb::Database;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{Adopter, AdopterProfile, MatchingPreferences, Pet},
};

#[derive(Deserialize)]
pub struct RegisterPayload {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub profile: AdopterProfile,
}

#[derive(Deserialize)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

/// Adopter as returned to clients: everything but the password hash.
#[derive(Serialize)]
pub struct AdopterView {
    pub id: String,
    pub username: String,
    pub email: String,
    pub profile: AdopterProfile,
    pub preferences: MatchingPreferences,
    pub adopted_pets: Vec<crate::models::AdoptedPet>,
    pub registered_at: BsonDateTime,
}

impl From<Adopter> for AdopterView {
    fn from(a: Adopter) -> Self {
        Self {
            id: a.id,
            username: a.username,
            email: a.email,
            profile: a.profile,
            preferences: a.preferences,
            adopted_pets: a.adopted_pets,
            registered_at: a.registered_at,
        }
    }
}

fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("failed to hash password: {e}")))
}

fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("invalid password hash format: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[post("/adopters/register")]
pub async fn register(
    db: web::Data<Database>,
    payload: web::Json<RegisterPayload>,
) -> Result<HttpResponse, AppError> {
    let p = payload.into_inner();
    let adopter_coll = db.collection::<Adopter>("adopters");

    if p.username.trim().is_empty() || p.email.trim().is_empty() || p.password.is_empty() {
        return Err(AppError::Validation(
            "username, email and password are required".into(),
        ));
    }

    if adopter_coll
        .find_one(doc! { "email": &p.email })
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(
            "An account with this email already exists".into(),
        ));
    }

    let adopter = Adopter {
        id: Uuid::new_v4().to_string(),
        username: p.username,
        email: p.email,
        password_hash: hash_password(&p.password)?,
        profile: p.profile,
        preferences: MatchingPreferences::default(),
        adopted_pets: Vec::new(),
        registered_at: BsonDateTime::now(),
    };

    adopter_coll.insert_one(&adopter).await?;

    Ok(HttpResponse::Created().json(AdopterView::from(adopter)))
}

#[post("/adopters/login")]
pub async fn login(
    db: web::Data<Database>,
    payload: web::Json<LoginPayload>,
) -> Result<HttpResponse, AppError> {
    let p = payload.into_inner();
    let adopter_coll = db.collection::<Adopter>("adopters");

    let adopter = adopter_coll
        .find_one(doc! { "email": &p.email })
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !verify_password(&p.password, &adopter.password_hash)? {
        return Err(AppError::Unauthorized);
    }

    Ok(HttpResponse::Ok().json(AdopterView::from(adopter)))
}

#[get("/adopters/{id}")]
pub async fn get_adopter(
    db: web::Data<Database>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let adopter_id = path.into_inner().to_string();
    let adopter_coll = db.collection::<Adopter>("adopters");

    let adopter = adopter_coll
        .find_one(doc! { "_id": &adopter_id })
        .await?
        .ok_or(AppError::NotFound("Adopter"))?;

    Ok(HttpResponse::Ok().json(AdopterView::from(adopter)))
}

#[put("/adopters/{id}/preferences")]
pub async fn update_preferences(
    db: web::Data<Database>,
    path: web::Path<Uuid>,
    payload: web::Json<MatchingPreferences>,
) -> Result<HttpResponse, AppError> {
    let adopter_id = path.into_inner().to_string();
    let prefs = payload.into_inner();
    let adopter_coll = db.collection::<Adopter>("adopters");

    let prefs_bson = bson::to_bson(&prefs)
        .map_err(|e| AppError::Internal(format!("failed to encode preferences: {e}")))?;

    let result = adopter_coll
        .update_one(
            doc! { "_id": &adopter_id },
            doc! { "$set": { "preferences": prefs_bson } },
        )
        .await?;

    if result.matched_count == 0 {
        return Err(AppError::NotFound("Adopter"));
    }

    Ok(HttpResponse::Ok().json(prefs))
}

#[get("/adopters/{id}/pets")]
pub async fn get_adopted_pets(
    db: web::Data<Database>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let adopter_id = path.into_inner().to_string();
    let adopter_coll = db.collection::<Adopter>("adopters");
    let pet_coll = db.collection::<Pet>("pets");

    let adopter = adopter_coll
        .find_one(doc! { "_id": &adopter_id })
        .await?
        .ok_or(AppError::NotFound("Adopter"))?;

    let id_array: Vec<Bson> = adopter
        .adopted_pets
        .iter()
        .map(|ap| Bson::String(ap.pet_id.clone()))
        .collect();

    let mut cursor = pet_coll
        .find(doc! { "_id": { "$in": Bson::Array(id_array) } })
        .await?;

    let mut pets = Vec::new();
    while let Some(p) = cursor.try_next().await? {
        pets.push(p);
    }

    #[derive(Serialize)]
    struct AdoptedPetItem {
        pet: Pet,
        adoption_date: BsonDateTime,
    }

    let items: Vec<AdoptedPetItem> = pets
        .into_iter()
        .filter_map(|pet| {
            adopter
                .adopted_pets
                .iter()
                .find(|ap| ap.pet_id == pet.id)
                .map(|ap| AdoptedPetItem {
                    adoption_date: ap.adoption_date,
                    pet,
                })
        })
        .collect();

    Ok(HttpResponse::Ok().json(items))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let hash = hash_password("correct-horse-battery-staple").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct-horse-battery-staple", &hash).unwrap());
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn same_password_hashes_differently() {
        let h1 = hash_password("same-password").unwrap();
        let h2 = hash_password("same-password").unwrap();
        assert_ne!(h1, h2);
    }
}
