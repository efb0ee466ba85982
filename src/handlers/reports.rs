use actix_web::{get, patch, post, web, HttpResponse};
use bson::{doc, DateTime as BsonDateTime, Document};
use futures::TryStreamExt;
use mongodb::{options::FindOptions, Database};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{AdoptionStatus, Pet, Report, ReportStatus, Shelter},
};

#[derive(Deserialize)]
pub struct SubmitReportPayload {
    pub reporter_name: Option<String>,
    pub reporter_phone: Option<String>,
    pub description: String,
    pub location: String,
    /// Base64 photo blob, stored inline.
    pub photo: Option<String>,
}

#[derive(Deserialize)]
pub struct ListReportsQuery {
    pub status: Option<ReportStatus>,
}

#[derive(Deserialize)]
pub struct UpdateReportStatusPayload {
    pub status: ReportStatus,
}

#[derive(Deserialize)]
pub struct RescuePayload {
    pub shelter_id: Uuid,
    pub name: String,
    pub species: String,
    pub breed: Option<String>,
    pub age_months: Option<i64>,
}

/// Staff triage moves. Rescued is reachable only through the rescue
/// conversion.
fn status_transition_allowed(from: ReportStatus, to: ReportStatus) -> bool {
    matches!(
        (from, to),
        (ReportStatus::Pending, ReportStatus::Investigating)
            | (ReportStatus::Pending, ReportStatus::Rejected)
            | (ReportStatus::Investigating, ReportStatus::Rejected)
    )
}

#[post("/reports")]
pub async fn submit_report(
    db: web::Data<Database>,
    payload: web::Json<SubmitReportPayload>,
) -> Result<HttpResponse, AppError> {
    let p = payload.into_inner();
    let report_coll = db.collection::<Report>("reports");

    if p.description.trim().is_empty() || p.location.trim().is_empty() {
        return Err(AppError::Validation(
            "description and location are required".into(),
        ));
    }

    let report = Report {
        id: Uuid::new_v4().to_string(),
        reporter_name: p.reporter_name,
        reporter_phone: p.reporter_phone,
        description: p.description,
        location: p.location,
        photo: p.photo,
        status: ReportStatus::Pending,
        reported_at: BsonDateTime::now(),
    };

    report_coll.insert_one(&report).await?;

    Ok(HttpResponse::Created().json(report))
}

#[get("/reports")]
pub async fn list_reports(
    db: web::Data<Database>,
    query: web::Query<ListReportsQuery>,
) -> Result<HttpResponse, AppError> {
    let report_coll = db.collection::<Report>("reports");

    let mut filter = doc! {};
    if let Some(status) = &query.status {
        filter.insert("status", status.as_str());
    }

    let options = FindOptions::builder()
        .sort(doc! { "reported_at": -1 })
        .build();

    let mut cursor = report_coll.find(filter).with_options(options).await?;

    let mut reports = Vec::new();
    while let Some(r) = cursor.try_next().await? {
        reports.push(r);
    }

    Ok(HttpResponse::Ok().json(reports))
}

#[patch("/reports/{id}/status")]
pub async fn update_report_status(
    db: web::Data<Database>,
    path: web::Path<Uuid>,
    payload: web::Json<UpdateReportStatusPayload>,
) -> Result<HttpResponse, AppError> {
    let report_id = path.into_inner().to_string();
    let target = payload.into_inner().status;
    let report_coll = db.collection::<Report>("reports");

    let report = report_coll
        .find_one(doc! { "_id": &report_id })
        .await?
        .ok_or(AppError::NotFound("Report"))?;

    if !status_transition_allowed(report.status, target) {
        return Err(AppError::Conflict(format!(
            "Report cannot move from {} to {}",
            report.status.as_str(),
            target.as_str()
        )));
    }

    let updated = report_coll
        .find_one_and_update(
            doc! { "_id": &report_id, "status": report.status.as_str() },
            doc! { "$set": { "status": target.as_str() } },
        )
        .return_document(mongodb::options::ReturnDocument::After)
        .await?
        .ok_or(AppError::Conflict("Report was updated concurrently".into()))?;

    Ok(HttpResponse::Ok().json(updated))
}

/// Convert a stray report into an adoptable pet. The pet copies the report
/// photo and descriptive text; no back-link to the report is kept.
#[post("/reports/{id}/rescue")]
pub async fn rescue_report(
    db: web::Data<Database>,
    path: web::Path<Uuid>,
    payload: web::Json<RescuePayload>,
) -> Result<HttpResponse, AppError> {
    let report_id = path.into_inner().to_string();
    let p = payload.into_inner();
    let shelter_id = p.shelter_id.to_string();

    let report_coll = db.collection::<Report>("reports");
    let shelter_coll = db.collection::<Shelter>("shelters");
    let pet_coll = db.collection::<Pet>("pets");

    if p.name.trim().is_empty() || p.species.trim().is_empty() {
        return Err(AppError::Validation("name and species are required".into()));
    }

    let report = report_coll
        .find_one(doc! { "_id": &report_id })
        .await?
        .ok_or(AppError::NotFound("Report"))?;

    if matches!(report.status, ReportStatus::Rescued | ReportStatus::Rejected) {
        return Err(AppError::Conflict(format!(
            "Report is already {}",
            report.status.as_str()
        )));
    }

    shelter_coll
        .find_one(doc! { "_id": &shelter_id })
        .await?
        .ok_or(AppError::NotFound("Shelter"))?;

    // Mark the report first with a status guard so a double-submitted rescue
    // creates one pet, not two.
    let marked = report_coll
        .update_one(
            rescue_claim_filter(&report_id),
            doc! { "$set": { "status": ReportStatus::Rescued.as_str() } },
        )
        .await?;
    if marked.matched_count == 0 {
        return Err(AppError::Conflict("Report has already been resolved".into()));
    }

    let pet = Pet {
        id: Uuid::new_v4().to_string(),
        name: p.name,
        species: p.species,
        breed: p.breed,
        age_months: p.age_months,
        sex: None,
        size: None,
        description: Some(rescue_description(&report)),
        photo: report.photo.clone(),
        shelter_id,
        adoption_status: AdoptionStatus::Available,
        listed_at: BsonDateTime::now(),
    };

    pet_coll.insert_one(&pet).await?;

    Ok(HttpResponse::Created().json(pet))
}

fn rescue_claim_filter(report_id: &str) -> Document {
    doc! {
        "_id": report_id,
        "status": { "$in": [
            ReportStatus::Pending.as_str(),
            ReportStatus::Investigating.as_str(),
        ] },
    }
}

fn rescue_description(report: &Report) -> String {
    format!(
        "Rescued stray reported at {}. {}",
        report.location, report.description
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triage_transitions() {
        assert!(status_transition_allowed(
            ReportStatus::Pending,
            ReportStatus::Investigating
        ));
        assert!(status_transition_allowed(
            ReportStatus::Pending,
            ReportStatus::Rejected
        ));
        assert!(status_transition_allowed(
            ReportStatus::Investigating,
            ReportStatus::Rejected
        ));
    }

    #[test]
    fn rescued_is_not_reachable_by_status_update() {
        for from in [
            ReportStatus::Pending,
            ReportStatus::Investigating,
            ReportStatus::Rescued,
            ReportStatus::Rejected,
        ] {
            assert!(!status_transition_allowed(from, ReportStatus::Rescued));
        }
    }

    #[test]
    fn resolved_reports_are_terminal() {
        for from in [ReportStatus::Rescued, ReportStatus::Rejected] {
            for to in [
                ReportStatus::Pending,
                ReportStatus::Investigating,
                ReportStatus::Rejected,
            ] {
                assert!(!status_transition_allowed(from, to));
            }
        }
    }

    #[test]
    fn rescue_claim_only_matches_unresolved_reports() {
        let filter = rescue_claim_filter("report-1");
        assert_eq!(filter.get_str("_id").unwrap(), "report-1");
        let allowed = filter
            .get_document("status")
            .unwrap()
            .get_array("$in")
            .unwrap();
        assert_eq!(allowed.len(), 2);
    }

    #[test]
    fn rescue_description_copies_report_text() {
        let report = Report {
            id: "report-1".into(),
            reporter_name: None,
            reporter_phone: None,
            description: "Thin grey tabby, very friendly".into(),
            location: "Mill Road underpass".into(),
            photo: None,
            status: ReportStatus::Investigating,
            reported_at: BsonDateTime::now(),
        };
        let text = rescue_description(&report);
        assert!(text.contains("Mill Road underpass"));
        assert!(text.contains("Thin grey tabby"));
    }
}
