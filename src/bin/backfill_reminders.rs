//! Backfill care reminders for adoptions that predate the reminder system.
//!
//! Walks every adopter's adopted pets and generates reminders from the owning
//! shelter's active templates, anchored at the stored adoption date instead
//! of "now". At-least-once batch job: a (pet, adopter) pair with any existing
//! reminder document is skipped, so re-running creates nothing new.

use bson::doc;
use futures::TryStreamExt;
use mongodb::Client;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use pawhaven::{
    config::Config,
    error::AppError,
    models::{Adopter, CareReminder, Pet, ReminderTemplate},
    reminders::build_reminders,
};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = Config::load();
    let client = Client::with_uri_str(&config.mongodb_uri).await?;
    let db = client.database(&config.db_name);

    let adopter_coll = db.collection::<Adopter>("adopters");
    let pet_coll = db.collection::<Pet>("pets");
    let template_coll = db.collection::<ReminderTemplate>("reminder_templates");
    let reminder_coll = db.collection::<CareReminder>("care_reminders");

    let mut created = 0usize;
    let mut skipped = 0usize;

    let mut adopters = adopter_coll.find(doc! {}).await?;
    while let Some(adopter) = adopters.try_next().await? {
        for adoption in &adopter.adopted_pets {
            let existing = reminder_coll
                .find_one(doc! {
                    "pet_id": &adoption.pet_id,
                    "adopter_id": &adopter.id,
                })
                .await?;
            if existing.is_some() {
                skipped += 1;
                continue;
            }

            let Some(pet) = pet_coll.find_one(doc! { "_id": &adoption.pet_id }).await? else {
                warn!(
                    "adopted pet {} for adopter {} no longer exists, skipping",
                    adoption.pet_id, adopter.id
                );
                skipped += 1;
                continue;
            };

            let mut cursor = template_coll
                .find(doc! { "shelter_id": &pet.shelter_id })
                .await?;
            let mut templates = Vec::new();
            while let Some(t) = cursor.try_next().await? {
                templates.push(t);
            }

            let reminders = build_reminders(
                &templates,
                &adoption.pet_id,
                &adopter.id,
                adoption.adoption_date.to_chrono(),
            );

            if reminders.is_empty() {
                skipped += 1;
                continue;
            }

            reminder_coll.insert_many(&reminders).await?;
            created += reminders.len();
            info!(
                "backfilled {} reminders for pet {} / adopter {}",
                reminders.len(),
                adoption.pet_id,
                adopter.id
            );
        }
    }

    info!("backfill complete: {created} reminders created, {skipped} pets skipped");

    Ok(())
}
