use actix_web::{get, post, web, HttpResponse};
use bson::{doc, Document};
use futures::TryStreamExt;
use mongodb::Database;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{GeoPoint, VetClinic},
};

const DEFAULT_MAX_DISTANCE_M: f64 = 10_000.0;

#[derive(Deserialize)]
pub struct NearbyQuery {
    pub lng: f64,
    pub lat: f64,
    pub max_distance_m: Option<f64>,
}

#[derive(Deserialize)]
pub struct CreateClinicPayload {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub lng: f64,
    pub lat: f64,
}

fn validate_coordinates(lng: f64, lat: f64) -> Result<(), AppError> {
    if !(-180.0..=180.0).contains(&lng) || !(-90.0..=90.0).contains(&lat) {
        return Err(AppError::Validation("coordinates out of range".into()));
    }
    Ok(())
}

/// `$nearSphere` sorts nearest-first; needs the 2dsphere index created at
/// startup.
fn nearby_filter(lng: f64, lat: f64, max_distance_m: f64) -> Document {
    doc! {
        "location": {
            "$nearSphere": {
                "$geometry": {
                    "type": "Point",
                    "coordinates": [lng, lat],
                },
                "$maxDistance": max_distance_m,
            }
        }
    }
}

#[get("/clinics/nearby")]
pub async fn nearby_clinics(
    db: web::Data<Database>,
    query: web::Query<NearbyQuery>,
) -> Result<HttpResponse, AppError> {
    let q = query.into_inner();
    validate_coordinates(q.lng, q.lat)?;
    let max_distance = q.max_distance_m.unwrap_or(DEFAULT_MAX_DISTANCE_M);

    let clinic_coll = db.collection::<VetClinic>("vet_clinics");

    let mut cursor = clinic_coll
        .find(nearby_filter(q.lng, q.lat, max_distance))
        .await?;

    let mut clinics = Vec::new();
    while let Some(c) = cursor.try_next().await? {
        clinics.push(c);
    }

    Ok(HttpResponse::Ok().json(clinics))
}

#[post("/clinics")]
pub async fn create_clinic(
    db: web::Data<Database>,
    payload: web::Json<CreateClinicPayload>,
) -> Result<HttpResponse, AppError> {
    let p = payload.into_inner();
    if p.name.trim().is_empty() {
        return Err(AppError::Validation("name is required".into()));
    }
    validate_coordinates(p.lng, p.lat)?;

    let clinic = VetClinic {
        id: Uuid::new_v4().to_string(),
        name: p.name,
        address: p.address,
        phone: p.phone,
        location: GeoPoint::new(p.lng, p.lat),
    };

    db.collection::<VetClinic>("vet_clinics")
        .insert_one(&clinic)
        .await?;

    Ok(HttpResponse::Created().json(clinic))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_validated_against_wgs84_bounds() {
        assert!(validate_coordinates(0.1278, 51.5074).is_ok());
        assert!(validate_coordinates(-180.0, 90.0).is_ok());
        assert!(validate_coordinates(181.0, 0.0).is_err());
        assert!(validate_coordinates(0.0, -91.0).is_err());
    }

    #[test]
    fn nearby_filter_builds_geojson_point() {
        let filter = nearby_filter(0.1278, 51.5074, 5000.0);
        let near = filter
            .get_document("location")
            .unwrap()
            .get_document("$nearSphere")
            .unwrap();
        let geometry = near.get_document("$geometry").unwrap();
        assert_eq!(geometry.get_str("type").unwrap(), "Point");
        let coords = geometry.get_array("coordinates").unwrap();
        assert_eq!(coords[0].as_f64().unwrap(), 0.1278);
        assert_eq!(coords[1].as_f64().unwrap(), 51.5074);
        assert_eq!(near.get_f64("$maxDistance").unwrap(), 5000.0);
    }
}
