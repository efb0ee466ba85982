use actix_web::{get, patch, post, web, HttpResponse};
use bson::doc;
use futures::TryStreamExt;
use mongodb::{options::ReturnDocument, Database};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{ReminderCategory, ReminderTemplate, Shelter},
};

#[derive(Deserialize)]
pub struct CreateTemplatePayload {
    pub title: String,
    pub category: ReminderCategory,
    pub days_after_adoption: i64,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Deserialize)]
pub struct UpdateTemplatePayload {
    pub title: Option<String>,
    pub category: Option<ReminderCategory>,
    pub days_after_adoption: Option<i64>,
    pub active: Option<bool>,
}

#[get("/shelters/{id}/templates")]
pub async fn list_templates(
    db: web::Data<Database>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let shelter_id = path.into_inner().to_string();
    let template_coll = db.collection::<ReminderTemplate>("reminder_templates");

    let mut cursor = template_coll
        .find(doc! { "shelter_id": &shelter_id })
        .await?;

    let mut templates = Vec::new();
    while let Some(t) = cursor.try_next().await? {
        templates.push(t);
    }

    Ok(HttpResponse::Ok().json(templates))
}

#[post("/shelters/{id}/templates")]
pub async fn create_template(
    db: web::Data<Database>,
    path: web::Path<Uuid>,
    payload: web::Json<CreateTemplatePayload>,
) -> Result<HttpResponse, AppError> {
    let shelter_id = path.into_inner().to_string();
    let p = payload.into_inner();
    let shelter_coll = db.collection::<Shelter>("shelters");
    let template_coll = db.collection::<ReminderTemplate>("reminder_templates");

    if p.title.trim().is_empty() {
        return Err(AppError::Validation("title is required".into()));
    }
    if p.days_after_adoption < 0 {
        return Err(AppError::Validation(
            "days_after_adoption must be zero or positive".into(),
        ));
    }

    shelter_coll
        .find_one(doc! { "_id": &shelter_id })
        .await?
        .ok_or(AppError::NotFound("Shelter"))?;

    let template = ReminderTemplate {
        id: Uuid::new_v4().to_string(),
        shelter_id,
        title: p.title,
        category: p.category,
        days_after_adoption: p.days_after_adoption,
        active: p.active,
    };

    template_coll.insert_one(&template).await?;

    Ok(HttpResponse::Created().json(template))
}

#[patch("/shelters/{id}/templates/{template_id}")]
pub async fn update_template(
    db: web::Data<Database>,
    path: web::Path<(Uuid, Uuid)>,
    payload: web::Json<UpdateTemplatePayload>,
) -> Result<HttpResponse, AppError> {
    let (shelter_id, template_id) = path.into_inner();
    let shelter_id = shelter_id.to_string();
    let template_id = template_id.to_string();
    let p = payload.into_inner();
    let template_coll = db.collection::<ReminderTemplate>("reminder_templates");

    let template = template_coll
        .find_one(doc! { "_id": &template_id })
        .await?
        .ok_or(AppError::NotFound("Template"))?;

    if template.shelter_id != shelter_id {
        return Err(AppError::Forbidden(
            "This template belongs to another shelter".into(),
        ));
    }

    if let Some(days) = p.days_after_adoption {
        if days < 0 {
            return Err(AppError::Validation(
                "days_after_adoption must be zero or positive".into(),
            ));
        }
    }

    let mut update_doc = doc! {};
    if let Some(title) = p.title {
        update_doc.insert("title", title);
    }
    if let Some(category) = p.category {
        update_doc.insert("category", category.as_str());
    }
    if let Some(days) = p.days_after_adoption {
        update_doc.insert("days_after_adoption", days);
    }
    if let Some(active) = p.active {
        update_doc.insert("active", active);
    }

    if update_doc.is_empty() {
        return Ok(HttpResponse::Ok().json(template));
    }

    let updated = template_coll
        .find_one_and_update(doc! { "_id": &template_id }, doc! { "$set": update_doc })
        .return_document(ReturnDocument::After)
        .await?
        .ok_or(AppError::NotFound("Template"))?;

    Ok(HttpResponse::Ok().json(updated))
}
