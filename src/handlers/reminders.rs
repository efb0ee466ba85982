use actix_web::{get, patch, web, HttpResponse};
use bson::doc;
use futures::TryStreamExt;
use mongodb::{
    options::{FindOptions, ReturnDocument},
    Database,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{CareReminder, ReminderStatus},
};

#[derive(Deserialize)]
pub struct UpdateReminderPayload {
    pub status: ReminderStatus,
}

/// A reminder only moves out of Pending, and only once.
fn transition_allowed(from: ReminderStatus, to: ReminderStatus) -> bool {
    matches!(
        (from, to),
        (ReminderStatus::Pending, ReminderStatus::Completed)
            | (ReminderStatus::Pending, ReminderStatus::Disabled)
    )
}

#[get("/reminders/pet/{id}")]
pub async fn get_pet_reminders(
    db: web::Data<Database>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let pet_id = path.into_inner().to_string();
    let reminder_coll = db.collection::<CareReminder>("care_reminders");

    let options = FindOptions::builder().sort(doc! { "due_date": 1 }).build();

    let mut cursor = reminder_coll
        .find(doc! {
            "pet_id": &pet_id,
            "status": { "$ne": ReminderStatus::Disabled.as_str() },
        })
        .with_options(options)
        .await?;

    let mut reminders = Vec::new();
    while let Some(r) = cursor.try_next().await? {
        reminders.push(r);
    }

    Ok(HttpResponse::Ok().json(reminders))
}

#[patch("/reminders/{id}")]
pub async fn update_reminder(
    db: web::Data<Database>,
    path: web::Path<Uuid>,
    payload: web::Json<UpdateReminderPayload>,
) -> Result<HttpResponse, AppError> {
    let reminder_id = path.into_inner().to_string();
    let target = payload.into_inner().status;
    let reminder_coll = db.collection::<CareReminder>("care_reminders");

    let reminder = reminder_coll
        .find_one(doc! { "_id": &reminder_id })
        .await?
        .ok_or(AppError::NotFound("Reminder"))?;

    if !transition_allowed(reminder.status, target) {
        return Err(AppError::Conflict(format!(
            "Reminder cannot move from {} to {}",
            reminder.status.as_str(),
            target.as_str()
        )));
    }

    let updated = reminder_coll
        .find_one_and_update(
            doc! { "_id": &reminder_id, "status": reminder.status.as_str() },
            doc! { "$set": { "status": target.as_str() } },
        )
        .return_document(ReturnDocument::After)
        .await?
        .ok_or(AppError::Conflict("Reminder was updated concurrently".into()))?;

    Ok(HttpResponse::Ok().json(updated))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_can_complete_or_disable() {
        assert!(transition_allowed(
            ReminderStatus::Pending,
            ReminderStatus::Completed
        ));
        assert!(transition_allowed(
            ReminderStatus::Pending,
            ReminderStatus::Disabled
        ));
    }

    #[test]
    fn completed_and_disabled_are_terminal() {
        for from in [ReminderStatus::Completed, ReminderStatus::Disabled] {
            for to in [
                ReminderStatus::Pending,
                ReminderStatus::Completed,
                ReminderStatus::Disabled,
            ] {
                assert!(!transition_allowed(from, to));
            }
        }
    }

    #[test]
    fn pending_cannot_stay_pending_via_update() {
        assert!(!transition_allowed(
            ReminderStatus::Pending,
            ReminderStatus::Pending
        ));
    }
}
