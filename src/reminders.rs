//! Care-reminder generation. Runs inside request approval (anchored at the
//! approval time) and from the backfill binary (anchored at the stored
//! adoption date).

use bson::{doc, DateTime as BsonDateTime};
use chrono::{DateTime, Duration, Utc};
use futures::TryStreamExt;
use mongodb::Database;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{CareReminder, ReminderSource, ReminderStatus, ReminderTemplate},
};

/// One reminder per active template. `category` always comes from the
/// template's own field; the title-substring inference the legacy approve
/// path used is gone.
pub fn build_reminders(
    templates: &[ReminderTemplate],
    pet_id: &str,
    adopter_id: &str,
    anchor: DateTime<Utc>,
) -> Vec<CareReminder> {
    let created_at = BsonDateTime::from_millis(anchor.timestamp_millis());

    templates
        .iter()
        .filter(|t| t.active)
        .map(|t| {
            let due = anchor + Duration::days(t.days_after_adoption);
            CareReminder {
                id: Uuid::new_v4().to_string(),
                pet_id: pet_id.to_string(),
                adopter_id: adopter_id.to_string(),
                template_id: t.id.clone(),
                title: t.title.clone(),
                category: t.category,
                due_date: BsonDateTime::from_millis(due.timestamp_millis()),
                status: ReminderStatus::Pending,
                created_by: ReminderSource::System,
                created_at,
            }
        })
        .collect()
}

/// Delete-then-insert regeneration for one (pet, adopter) pair, so
/// re-approving the same request never duplicates reminders. Returns the
/// number of reminders created.
pub async fn regenerate_for_adoption(
    db: &Database,
    shelter_id: &str,
    pet_id: &str,
    adopter_id: &str,
    anchor: DateTime<Utc>,
) -> Result<usize, AppError> {
    let template_coll = db.collection::<ReminderTemplate>("reminder_templates");
    let reminder_coll = db.collection::<CareReminder>("care_reminders");

    let mut cursor = template_coll.find(doc! { "shelter_id": shelter_id }).await?;

    let mut templates = Vec::new();
    while let Some(t) = cursor.try_next().await? {
        templates.push(t);
    }

    reminder_coll
        .delete_many(doc! { "pet_id": pet_id, "adopter_id": adopter_id })
        .await?;

    let reminders = build_reminders(&templates, pet_id, adopter_id, anchor);
    if !reminders.is_empty() {
        reminder_coll.insert_many(&reminders).await?;
    }

    Ok(reminders.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReminderCategory;
    use chrono::TimeZone;

    fn template(id: &str, title: &str, days: i64, active: bool) -> ReminderTemplate {
        ReminderTemplate {
            id: id.to_string(),
            shelter_id: "shelter-1".to_string(),
            title: title.to_string(),
            category: ReminderCategory::Vaccination,
            days_after_adoption: days,
            active,
        }
    }

    #[test]
    fn one_reminder_per_active_template() {
        let templates = vec![
            template("t1", "Initial Vaccination", 7, true),
            template("t2", "Booster", 30, true),
            template("t3", "Retired checkup", 90, false),
        ];

        let anchor = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let reminders = build_reminders(&templates, "pet-1", "adopter-1", anchor);

        assert_eq!(reminders.len(), 2);
        assert!(reminders.iter().all(|r| r.template_id != "t3"));
    }

    #[test]
    fn due_date_is_anchor_plus_offset() {
        let templates = vec![template("t1", "Initial Vaccination", 7, true)];
        let anchor = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

        let reminders = build_reminders(&templates, "pet-1", "adopter-1", anchor);

        let expected = anchor + Duration::days(7);
        assert_eq!(
            reminders[0].due_date.timestamp_millis(),
            expected.timestamp_millis()
        );
    }

    #[test]
    fn category_copied_from_template() {
        let mut t = template("t1", "Post-adoption wellness visit", 14, true);
        t.category = ReminderCategory::HealthCheck;

        let reminders = build_reminders(
            &[t],
            "pet-1",
            "adopter-1",
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
        );

        // No title sniffing: a title without "vaccin" in it keeps its
        // template's category, and one with it would too.
        assert_eq!(reminders[0].category, ReminderCategory::HealthCheck);
    }

    #[test]
    fn new_reminders_are_pending_and_system_created() {
        let templates = vec![template("t1", "Initial Vaccination", 7, true)];
        let reminders = build_reminders(
            &templates,
            "pet-1",
            "adopter-1",
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
        );

        assert_eq!(reminders[0].status, ReminderStatus::Pending);
        assert_eq!(reminders[0].created_by, ReminderSource::System);
        assert_eq!(reminders[0].pet_id, "pet-1");
        assert_eq!(reminders[0].adopter_id, "adopter-1");
    }

    #[test]
    fn no_templates_means_no_reminders() {
        let reminders = build_reminders(
            &[],
            "pet-1",
            "adopter-1",
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
        );
        assert!(reminders.is_empty());
    }
}
