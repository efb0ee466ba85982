use actix_web::{delete, get, post, put, web, HttpResponse};
use bson::{doc, DateTime as BsonDateTime, Document};
use futures::TryStreamExt;
use mongodb::{options::FindOptions, Database};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{AdoptionStatus, Pet, Shelter},
};

#[derive(Deserialize)]
pub struct ListPetsQuery {
    pub species: Option<String>,
    pub status: Option<AdoptionStatus>,
}

#[derive(Deserialize)]
pub struct CreatePetPayload {
    pub name: String,
    pub species: String,
    pub breed: Option<String>,
    pub age_months: Option<i64>,
    pub sex: Option<String>,
    pub size: Option<String>,
    pub description: Option<String>,
    pub photo: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdatePetPayload {
    pub name: Option<String>,
    pub breed: Option<String>,
    pub age_months: Option<i64>,
    pub sex: Option<String>,
    pub size: Option<String>,
    pub description: Option<String>,
    pub photo: Option<String>,
}

fn list_filter(query: &ListPetsQuery) -> Document {
    let mut filter = doc! {};
    if let Some(species) = &query.species {
        filter.insert("species", species);
    }
    if let Some(status) = &query.status {
        filter.insert("adoption_status", status.as_str());
    }
    filter
}

#[get("/pets")]
pub async fn list_pets(
    db: web::Data<Database>,
    query: web::Query<ListPetsQuery>,
) -> Result<HttpResponse, AppError> {
    let pet_coll = db.collection::<Pet>("pets");

    let options = FindOptions::builder().sort(doc! { "listed_at": -1 }).build();

    let mut cursor = pet_coll
        .find(list_filter(&query))
        .with_options(options)
        .await?;

    let mut pets = Vec::new();
    while let Some(p) = cursor.try_next().await? {
        pets.push(p);
    }

    Ok(HttpResponse::Ok().json(pets))
}

#[get("/pets/{id}")]
pub async fn get_pet(
    db: web::Data<Database>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let pet_id = path.into_inner().to_string();
    let pet_coll = db.collection::<Pet>("pets");

    let pet = pet_coll
        .find_one(doc! { "_id": &pet_id })
        .await?
        .ok_or(AppError::NotFound("Pet"))?;

    Ok(HttpResponse::Ok().json(pet))
}

#[get("/shelters/{id}/pets")]
pub async fn list_shelter_pets(
    db: web::Data<Database>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let shelter_id = path.into_inner().to_string();
    let pet_coll = db.collection::<Pet>("pets");

    let options = FindOptions::builder().sort(doc! { "listed_at": -1 }).build();

    let mut cursor = pet_coll
        .find(doc! { "shelter_id": &shelter_id })
        .with_options(options)
        .await?;

    let mut pets = Vec::new();
    while let Some(p) = cursor.try_next().await? {
        pets.push(p);
    }

    Ok(HttpResponse::Ok().json(pets))
}

#[post("/shelters/{id}/pets")]
pub async fn create_pet(
    db: web::Data<Database>,
    path: web::Path<Uuid>,
    payload: web::Json<CreatePetPayload>,
) -> Result<HttpResponse, AppError> {
    let shelter_id = path.into_inner().to_string();
    let p = payload.into_inner();
    let shelter_coll = db.collection::<Shelter>("shelters");
    let pet_coll = db.collection::<Pet>("pets");

    if p.name.trim().is_empty() || p.species.trim().is_empty() {
        return Err(AppError::Validation("name and species are required".into()));
    }

    shelter_coll
        .find_one(doc! { "_id": &shelter_id })
        .await?
        .ok_or(AppError::NotFound("Shelter"))?;

    let pet = Pet {
        id: Uuid::new_v4().to_string(),
        name: p.name,
        species: p.species,
        breed: p.breed,
        age_months: p.age_months,
        sex: p.sex,
        size: p.size,
        description: p.description,
        photo: p.photo,
        shelter_id,
        adoption_status: AdoptionStatus::Available,
        listed_at: BsonDateTime::now(),
    };

    pet_coll.insert_one(&pet).await?;

    Ok(HttpResponse::Created().json(pet))
}

#[put("/shelters/{id}/pets/{pet_id}")]
pub async fn update_pet(
    db: web::Data<Database>,
    path: web::Path<(Uuid, Uuid)>,
    payload: web::Json<UpdatePetPayload>,
) -> Result<HttpResponse, AppError> {
    let (shelter_id, pet_id) = path.into_inner();
    let shelter_id = shelter_id.to_string();
    let pet_id = pet_id.to_string();
    let p = payload.into_inner();
    let pet_coll = db.collection::<Pet>("pets");

    let pet = pet_coll
        .find_one(doc! { "_id": &pet_id })
        .await?
        .ok_or(AppError::NotFound("Pet"))?;

    if pet.shelter_id != shelter_id {
        return Err(AppError::Forbidden("This pet belongs to another shelter".into()));
    }

    let mut update_doc = doc! {};
    if let Some(name) = p.name {
        update_doc.insert("name", name);
    }
    if let Some(breed) = p.breed {
        update_doc.insert("breed", breed);
    }
    if let Some(age_months) = p.age_months {
        update_doc.insert("age_months", age_months);
    }
    if let Some(sex) = p.sex {
        update_doc.insert("sex", sex);
    }
    if let Some(size) = p.size {
        update_doc.insert("size", size);
    }
    if let Some(description) = p.description {
        update_doc.insert("description", description);
    }
    if let Some(photo) = p.photo {
        update_doc.insert("photo", photo);
    }

    if update_doc.is_empty() {
        return Ok(HttpResponse::Ok().json(pet));
    }

    let updated = pet_coll
        .find_one_and_update(doc! { "_id": &pet_id }, doc! { "$set": update_doc })
        .return_document(mongodb::options::ReturnDocument::After)
        .await?
        .ok_or(AppError::NotFound("Pet"))?;

    Ok(HttpResponse::Ok().json(updated))
}

#[delete("/shelters/{id}/pets/{pet_id}")]
pub async fn delete_pet(
    db: web::Data<Database>,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, AppError> {
    let (shelter_id, pet_id) = path.into_inner();
    let shelter_id = shelter_id.to_string();
    let pet_id = pet_id.to_string();
    let pet_coll = db.collection::<Pet>("pets");

    let pet = pet_coll
        .find_one(doc! { "_id": &pet_id })
        .await?
        .ok_or(AppError::NotFound("Pet"))?;

    if pet.shelter_id != shelter_id {
        return Err(AppError::Forbidden("This pet belongs to another shelter".into()));
    }
    if pet.adoption_status == AdoptionStatus::Adopted {
        return Err(AppError::Conflict("Adopted pets cannot be delisted".into()));
    }

    pet_coll.delete_one(doc! { "_id": &pet_id }).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Pet removed",
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_means_unfiltered_listing() {
        let filter = list_filter(&ListPetsQuery {
            species: None,
            status: None,
        });
        assert!(filter.is_empty());
    }

    #[test]
    fn filters_combine_species_and_status() {
        let filter = list_filter(&ListPetsQuery {
            species: Some("cat".into()),
            status: Some(AdoptionStatus::Available),
        });
        assert_eq!(filter.get_str("species").unwrap(), "cat");
        assert_eq!(filter.get_str("adoption_status").unwrap(), "Available");
    }
}
