//! Adoption request lifecycle: adopter-side create/cancel/list and
//! shelter-side triage, approve and reject.
//!
//! Approve is a sequence of conditional updates rather than a transaction:
//! the pet document is claimed first with a status guard, so two racing
//! approvals for the same pet cannot both succeed. The loser sees a 409 and
//! its request stays Pending.

use actix_web::{delete, get, patch, post, web, HttpResponse};
use bson::{doc, DateTime as BsonDateTime, Document};
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::{options::FindOptions, Database};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{Adopter, AdoptionRequest, AdoptionStatus, Pet, RequestStatus},
    reminders,
};

#[derive(Deserialize)]
pub struct CreateRequestPayload {
    pub pet_id: Uuid,
}

#[derive(Deserialize, Default)]
pub struct RespondPayload {
    pub message: Option<String>,
}

/// Shared approve/reject preconditions. Ownership is checked before state so
/// a foreign shelter always gets a 403, never a state hint.
fn check_triage_preconditions(
    request: &AdoptionRequest,
    pet: &Pet,
    shelter_id: &str,
) -> Result<(), AppError> {
    if pet.shelter_id != shelter_id {
        return Err(AppError::Forbidden(
            "This request does not belong to your shelter".into(),
        ));
    }
    if request.status != RequestStatus::Pending {
        return Err(AppError::Conflict("Request is not pending".into()));
    }
    Ok(())
}

/// Every *other* pending request for the pet gets rejected when one is
/// approved.
fn sibling_rejection_filter(pet_id: &str, approved_request_id: &str) -> Document {
    doc! {
        "pet_id": pet_id,
        "status": RequestStatus::Pending.as_str(),
        "_id": { "$ne": approved_request_id },
    }
}

/// Undo filter for a pet claim whose request update lost a race (a
/// concurrent reject landing between the precondition read and the CAS).
/// Guarded on Adopted so it only releases a claim that actually happened.
fn release_claim_filter(pet_id: &str) -> Document {
    doc! {
        "_id": pet_id,
        "adoption_status": AdoptionStatus::Adopted.as_str(),
    }
}

/// Only a Pending entry is cancellable; Approved/Rejected entries stay put.
fn cancel_filter(adopter_id: &str, pet_id: &str) -> Document {
    doc! {
        "adopter_id": adopter_id,
        "pet_id": pet_id,
        "status": RequestStatus::Pending.as_str(),
    }
}

#[post("/adopters/{id}/request")]
pub async fn create_request(
    db: web::Data<Database>,
    path: web::Path<Uuid>,
    payload: web::Json<CreateRequestPayload>,
) -> Result<HttpResponse, AppError> {
    let adopter_id = path.into_inner().to_string();
    let pet_id = payload.into_inner().pet_id.to_string();

    let adopter_coll = db.collection::<Adopter>("adopters");
    let pet_coll = db.collection::<Pet>("pets");
    let request_coll = db.collection::<AdoptionRequest>("adoption_requests");

    adopter_coll
        .find_one(doc! { "_id": &adopter_id })
        .await?
        .ok_or(AppError::NotFound("Adopter"))?;

    let pet = pet_coll
        .find_one(doc! { "_id": &pet_id })
        .await?
        .ok_or(AppError::NotFound("Pet"))?;

    if pet.adoption_status != AdoptionStatus::Available {
        return Err(AppError::Conflict("Pet is not available for adoption".into()));
    }

    // At most one non-rejected request per (adopter, pet).
    let unresolved = request_coll
        .find_one(doc! {
            "adopter_id": &adopter_id,
            "pet_id": &pet_id,
            "status": { "$in": [
                RequestStatus::Pending.as_str(),
                RequestStatus::Approved.as_str(),
            ] },
        })
        .await?;
    if unresolved.is_some() {
        return Err(AppError::Conflict(
            "An open request for this pet already exists".into(),
        ));
    }

    let request = AdoptionRequest {
        id: Uuid::new_v4().to_string(),
        adopter_id,
        pet_id,
        shelter_id: pet.shelter_id,
        status: RequestStatus::Pending,
        request_date: BsonDateTime::now(),
        shelter_response: None,
        responded_at: None,
    };

    request_coll.insert_one(&request).await?;

    Ok(HttpResponse::Created().json(request))
}

#[delete("/adopters/{id}/request/{pet_id}")]
pub async fn cancel_request(
    db: web::Data<Database>,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, AppError> {
    let (adopter_id, pet_id) = path.into_inner();
    let request_coll = db.collection::<AdoptionRequest>("adoption_requests");

    let result = request_coll
        .delete_one(cancel_filter(&adopter_id.to_string(), &pet_id.to_string()))
        .await?;

    if result.deleted_count == 0 {
        return Err(AppError::NotFound("Pending request"));
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Request cancelled",
    })))
}

#[get("/adopters/{id}/requests")]
pub async fn get_adopter_requests(
    db: web::Data<Database>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let adopter_id = path.into_inner().to_string();
    let request_coll = db.collection::<AdoptionRequest>("adoption_requests");
    let pet_coll = db.collection::<Pet>("pets");

    let options = FindOptions::builder()
        .sort(doc! { "request_date": -1 })
        .build();

    let mut cursor = request_coll
        .find(doc! { "adopter_id": &adopter_id })
        .with_options(options)
        .await?;

    let mut requests = Vec::new();
    while let Some(r) = cursor.try_next().await? {
        requests.push(r);
    }

    let pet_ids: Vec<String> = requests.iter().map(|r| r.pet_id.clone()).collect();
    let mut pc = pet_coll.find(doc! { "_id": { "$in": pet_ids } }).await?;

    let mut pets = Vec::new();
    while let Some(p) = pc.try_next().await? {
        pets.push(p);
    }

    #[derive(Serialize)]
    struct AdopterRequestItem {
        request: AdoptionRequest,
        pet_name: Option<String>,
        pet_photo: Option<String>,
    }

    let items: Vec<AdopterRequestItem> = requests
        .into_iter()
        .map(|request| {
            let pet = pets.iter().find(|p| p.id == request.pet_id);
            AdopterRequestItem {
                pet_name: pet.map(|p| p.name.clone()),
                pet_photo: pet.and_then(|p| p.photo.clone()),
                request,
            }
        })
        .collect();

    Ok(HttpResponse::Ok().json(items))
}

#[get("/shelters/{id}/requests")]
pub async fn get_shelter_requests(
    db: web::Data<Database>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let shelter_id = path.into_inner().to_string();
    let request_coll = db.collection::<AdoptionRequest>("adoption_requests");
    let pet_coll = db.collection::<Pet>("pets");
    let adopter_coll = db.collection::<Adopter>("adopters");

    let options = FindOptions::builder()
        .sort(doc! { "request_date": -1 })
        .build();

    let mut cursor = request_coll
        .find(doc! { "shelter_id": &shelter_id })
        .with_options(options)
        .await?;

    let mut requests = Vec::new();
    while let Some(r) = cursor.try_next().await? {
        requests.push(r);
    }

    let pet_ids: Vec<String> = requests.iter().map(|r| r.pet_id.clone()).collect();
    let adopter_ids: Vec<String> = requests.iter().map(|r| r.adopter_id.clone()).collect();

    let mut pc = pet_coll.find(doc! { "_id": { "$in": pet_ids } }).await?;
    let mut pets = Vec::new();
    while let Some(p) = pc.try_next().await? {
        pets.push(p);
    }

    let mut ac = adopter_coll
        .find(doc! { "_id": { "$in": adopter_ids } })
        .await?;
    let mut adopters = Vec::new();
    while let Some(a) = ac.try_next().await? {
        adopters.push(a);
    }

    #[derive(Serialize)]
    struct TriageItem {
        request: AdoptionRequest,
        pet_name: Option<String>,
        pet_photo: Option<String>,
        adopter_username: Option<String>,
        adopter_email: Option<String>,
        adopter_phone: Option<String>,
    }

    let items: Vec<TriageItem> = requests
        .into_iter()
        .map(|request| {
            let pet = pets.iter().find(|p| p.id == request.pet_id);
            let adopter = adopters.iter().find(|a| a.id == request.adopter_id);
            TriageItem {
                pet_name: pet.map(|p| p.name.clone()),
                pet_photo: pet.and_then(|p| p.photo.clone()),
                adopter_username: adopter.map(|a| a.username.clone()),
                adopter_email: adopter.map(|a| a.email.clone()),
                adopter_phone: adopter.and_then(|a| a.profile.phone.clone()),
                request,
            }
        })
        .collect();

    Ok(HttpResponse::Ok().json(items))
}

#[post("/shelters/{id}/requests/{request_id}/approve")]
pub async fn approve_request(
    db: web::Data<Database>,
    path: web::Path<(Uuid, Uuid)>,
    payload: Option<web::Json<RespondPayload>>,
) -> Result<HttpResponse, AppError> {
    let (shelter_id, request_id) = path.into_inner();
    let shelter_id = shelter_id.to_string();
    let request_id = request_id.to_string();
    let response_message = payload
        .map(|p| p.into_inner())
        .unwrap_or_default()
        .message
        .unwrap_or_else(|| "Your adoption request has been approved".to_string());

    let request_coll = db.collection::<AdoptionRequest>("adoption_requests");
    let pet_coll = db.collection::<Pet>("pets");
    let adopter_coll = db.collection::<Adopter>("adopters");

    let request = request_coll
        .find_one(doc! { "_id": &request_id })
        .await?
        .ok_or(AppError::NotFound("Request"))?;

    let pet = pet_coll
        .find_one(doc! { "_id": &request.pet_id })
        .await?
        .ok_or(AppError::NotFound("Pet"))?;

    check_triage_preconditions(&request, &pet, &shelter_id)?;

    // Claim the pet. The status guard makes this the linearization point:
    // a concurrent approval for another request loses here and changes
    // nothing.
    let claimed = pet_coll
        .update_one(
            doc! {
                "_id": &pet.id,
                "adoption_status": { "$ne": AdoptionStatus::Adopted.as_str() },
            },
            doc! { "$set": { "adoption_status": AdoptionStatus::Adopted.as_str() } },
        )
        .await?;
    if claimed.matched_count == 0 {
        return Err(AppError::Conflict("Pet has already been adopted".into()));
    }

    let now = Utc::now();
    let responded_at = BsonDateTime::from_millis(now.timestamp_millis());

    let approved = request_coll
        .update_one(
            doc! { "_id": &request_id, "status": RequestStatus::Pending.as_str() },
            doc! { "$set": {
                "status": RequestStatus::Approved.as_str(),
                "shelter_response": &response_message,
                "responded_at": responded_at,
            } },
        )
        .await?;
    if approved.matched_count == 0 {
        // The request stopped being Pending after we claimed the pet.
        // Release the claim so the pet stays adoptable.
        pet_coll
            .update_one(
                release_claim_filter(&pet.id),
                doc! { "$set": { "adoption_status": AdoptionStatus::Available.as_str() } },
            )
            .await?;
        return Err(AppError::Conflict("Request is not pending".into()));
    }

    let created = reminders::regenerate_for_adoption(
        &db,
        &request.shelter_id,
        &request.pet_id,
        &request.adopter_id,
        now,
    )
    .await?;

    request_coll
        .update_many(
            sibling_rejection_filter(&request.pet_id, &request_id),
            doc! { "$set": {
                "status": RequestStatus::Rejected.as_str(),
                "shelter_response": "Pet was adopted by another applicant",
                "responded_at": responded_at,
            } },
        )
        .await?;

    let adoption_entry = doc! {
        "pet_id": &request.pet_id,
        "adoption_date": responded_at,
    };
    adopter_coll
        .update_one(
            doc! {
                "_id": &request.adopter_id,
                "adopted_pets.pet_id": { "$ne": &request.pet_id },
            },
            doc! { "$push": { "adopted_pets": adoption_entry } },
        )
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": format!("Request approved; {created} care reminders scheduled"),
    })))
}

#[patch("/shelters/{id}/requests/{request_id}/reject")]
pub async fn reject_request(
    db: web::Data<Database>,
    path: web::Path<(Uuid, Uuid)>,
    payload: Option<web::Json<RespondPayload>>,
) -> Result<HttpResponse, AppError> {
    let (shelter_id, request_id) = path.into_inner();
    let shelter_id = shelter_id.to_string();
    let request_id = request_id.to_string();
    let response_message = payload
        .map(|p| p.into_inner())
        .unwrap_or_default()
        .message
        .unwrap_or_else(|| "Your adoption request has been rejected".to_string());

    let request_coll = db.collection::<AdoptionRequest>("adoption_requests");
    let pet_coll = db.collection::<Pet>("pets");

    let request = request_coll
        .find_one(doc! { "_id": &request_id })
        .await?
        .ok_or(AppError::NotFound("Request"))?;

    let pet = pet_coll
        .find_one(doc! { "_id": &request.pet_id })
        .await?
        .ok_or(AppError::NotFound("Pet"))?;

    check_triage_preconditions(&request, &pet, &shelter_id)?;

    // Reject touches this request only: no pet write, no reminders, no
    // sibling updates.
    let rejected = request_coll
        .update_one(
            doc! { "_id": &request_id, "status": RequestStatus::Pending.as_str() },
            doc! { "$set": {
                "status": RequestStatus::Rejected.as_str(),
                "shelter_response": &response_message,
                "responded_at": BsonDateTime::now(),
            } },
        )
        .await?;
    if rejected.matched_count == 0 {
        return Err(AppError::Conflict("Request is not pending".into()));
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Request rejected",
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AdoptionStatus;

    fn request(status: RequestStatus) -> AdoptionRequest {
        AdoptionRequest {
            id: "req-1".into(),
            adopter_id: "adopter-1".into(),
            pet_id: "pet-1".into(),
            shelter_id: "shelter-1".into(),
            status,
            request_date: BsonDateTime::now(),
            shelter_response: None,
            responded_at: None,
        }
    }

    fn pet(shelter_id: &str) -> Pet {
        Pet {
            id: "pet-1".into(),
            name: "Biscuit".into(),
            species: "dog".into(),
            breed: Some("beagle".into()),
            age_months: Some(18),
            sex: None,
            size: None,
            description: None,
            photo: None,
            shelter_id: shelter_id.into(),
            adoption_status: AdoptionStatus::Available,
            listed_at: BsonDateTime::now(),
        }
    }

    #[test]
    fn pending_request_from_owning_shelter_passes() {
        let r = request(RequestStatus::Pending);
        assert!(check_triage_preconditions(&r, &pet("shelter-1"), "shelter-1").is_ok());
    }

    #[test]
    fn foreign_shelter_is_forbidden() {
        let r = request(RequestStatus::Pending);
        let err = check_triage_preconditions(&r, &pet("shelter-2"), "shelter-1").unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn non_pending_request_is_a_conflict() {
        for status in [RequestStatus::Approved, RequestStatus::Rejected] {
            let r = request(status);
            let err = check_triage_preconditions(&r, &pet("shelter-1"), "shelter-1").unwrap_err();
            assert!(matches!(err, AppError::Conflict(_)));
        }
    }

    #[test]
    fn ownership_is_checked_before_state() {
        // Wrong shelter on an already-approved request: still a 403, never a
        // state hint.
        let r = request(RequestStatus::Approved);
        let err = check_triage_preconditions(&r, &pet("shelter-2"), "shelter-1").unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn sibling_filter_targets_other_pending_requests_only() {
        let filter = sibling_rejection_filter("pet-1", "req-1");
        assert_eq!(filter.get_str("pet_id").unwrap(), "pet-1");
        assert_eq!(filter.get_str("status").unwrap(), "Pending");
        let excluded = filter.get_document("_id").unwrap();
        assert_eq!(excluded.get_str("$ne").unwrap(), "req-1");
    }

    #[test]
    fn claim_release_only_touches_an_adopted_pet() {
        let filter = release_claim_filter("pet-1");
        assert_eq!(filter.get_str("_id").unwrap(), "pet-1");
        // A pet already back to Available (or never claimed) is left alone.
        assert_eq!(filter.get_str("adoption_status").unwrap(), "Adopted");
    }

    #[test]
    fn cancel_only_matches_pending_entries() {
        let filter = cancel_filter("adopter-1", "pet-1");
        assert_eq!(filter.get_str("adopter_id").unwrap(), "adopter-1");
        assert_eq!(filter.get_str("pet_id").unwrap(), "pet-1");
        assert_eq!(filter.get_str("status").unwrap(), "Pending");
    }
}
