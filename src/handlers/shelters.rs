use actix_web::{get, post, put, web, HttpResponse};
use bson::{doc, DateTime as BsonDateTime};
use mongodb::{options::ReturnDocument, Database};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{config::Config, error::AppError, models::Shelter};

#[derive(Deserialize)]
pub struct RegisterShelterPayload {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateShelterPayload {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
}

#[post("/shelters/register")]
pub async fn register_shelter(
    db: web::Data<Database>,
    payload: web::Json<RegisterShelterPayload>,
) -> Result<HttpResponse, AppError> {
    let p = payload.into_inner();
    let shelter_coll = db.collection::<Shelter>("shelters");

    if p.name.trim().is_empty() || p.email.trim().is_empty() {
        return Err(AppError::Validation("name and email are required".into()));
    }

    if shelter_coll
        .find_one(doc! { "email": &p.email })
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(
            "A shelter with this email already exists".into(),
        ));
    }

    let shelter = Shelter {
        id: Uuid::new_v4().to_string(),
        name: p.name,
        email: p.email,
        phone: p.phone,
        address: p.address,
        city: p.city,
        registered_at: BsonDateTime::now(),
    };

    shelter_coll.insert_one(&shelter).await?;

    Ok(HttpResponse::Created().json(shelter))
}

#[get("/shelters/{id}")]
pub async fn get_shelter(
    db: web::Data<Database>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let shelter_id = path.into_inner().to_string();
    let shelter_coll = db.collection::<Shelter>("shelters");

    let shelter = shelter_coll
        .find_one(doc! { "_id": &shelter_id })
        .await?
        .ok_or(AppError::NotFound("Shelter"))?;

    Ok(HttpResponse::Ok().json(shelter))
}

fn shelter_update_doc(p: UpdateShelterPayload) -> bson::Document {
    let mut update_doc = doc! {};
    if let Some(name) = p.name {
        update_doc.insert("name", name);
    }
    if let Some(email) = p.email {
        update_doc.insert("email", email);
    }
    if let Some(phone) = p.phone {
        update_doc.insert("phone", phone);
    }
    if let Some(address) = p.address {
        update_doc.insert("address", address);
    }
    if let Some(city) = p.city {
        update_doc.insert("city", city);
    }
    update_doc
}

#[put("/shelters/{id}")]
pub async fn update_shelter(
    db: web::Data<Database>,
    path: web::Path<Uuid>,
    payload: web::Json<UpdateShelterPayload>,
) -> Result<HttpResponse, AppError> {
    let shelter_id = path.into_inner().to_string();
    let p = payload.into_inner();
    let shelter_coll = db.collection::<Shelter>("shelters");

    let shelter = shelter_coll
        .find_one(doc! { "_id": &shelter_id })
        .await?
        .ok_or(AppError::NotFound("Shelter"))?;

    let update_doc = shelter_update_doc(p);

    // An all-fields-omitted payload is valid; an empty $set is not.
    if update_doc.is_empty() {
        return Ok(HttpResponse::Ok().json(shelter));
    }

    let shelter = shelter_coll
        .find_one_and_update(doc! { "_id": &shelter_id }, doc! { "$set": update_doc })
        .return_document(ReturnDocument::After)
        .await?
        .ok_or(AppError::NotFound("Shelter"))?;

    Ok(HttpResponse::Ok().json(shelter))
}

/// Public contact comes from configuration, not from a specially-flagged
/// shelter document.
#[get("/contact")]
pub async fn get_public_contact(config: web::Data<Config>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "name": config.contact_name,
        "email": config.contact_email,
        "phone": config.contact_phone,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_fields_omitted_builds_no_update() {
        let update = shelter_update_doc(UpdateShelterPayload {
            name: None,
            email: None,
            phone: None,
            address: None,
            city: None,
        });
        assert!(update.is_empty());
    }

    #[test]
    fn only_provided_fields_are_set() {
        let update = shelter_update_doc(UpdateShelterPayload {
            name: Some("Northside Rescue".into()),
            email: None,
            phone: Some("555-0101".into()),
            address: None,
            city: None,
        });
        assert_eq!(update.len(), 2);
        assert_eq!(update.get_str("name").unwrap(), "Northside Rescue");
        assert_eq!(update.get_str("phone").unwrap(), "555-0101");
    }
}
