use bson::DateTime as BsonDateTime;
use serde::{Deserialize, Serialize};

// ___ adopters collection ___
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct AdopterProfile {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct MatchingPreferences {
    pub species: Option<String>,
    pub size: Option<String>,
    pub activity_level: Option<String>,
}

// ___ embedded in Adopter.adopted_pets ___
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AdoptedPet {
    pub pet_id: String,
    pub adoption_date: BsonDateTime,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Adopter {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub profile: AdopterProfile,
    pub preferences: MatchingPreferences,
    pub adopted_pets: Vec<AdoptedPet>,
    pub registered_at: BsonDateTime,
}

// ___ adoption_requests collection ___
// Requests are first-class documents keyed by (adopter_id, pet_id) rather
// than an embedded array, so shelter-side triage and the "reject all other
// pending requests for this pet" step are single indexed queries.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "Pending",
            RequestStatus::Approved => "Approved",
            RequestStatus::Rejected => "Rejected",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AdoptionRequest {
    #[serde(rename = "_id")]
    pub id: String,
    pub adopter_id: String,
    pub pet_id: String,
    pub shelter_id: String,
    pub status: RequestStatus,
    pub request_date: BsonDateTime,
    pub shelter_response: Option<String>,
    pub responded_at: Option<BsonDateTime>,
}

// ___ pets collection ___
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum AdoptionStatus {
    Available,
    Pending,
    Adopted,
}

impl AdoptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdoptionStatus::Available => "Available",
            AdoptionStatus::Pending => "Pending",
            AdoptionStatus::Adopted => "Adopted",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Pet {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub species: String,
    pub breed: Option<String>,
    pub age_months: Option<i64>,
    pub sex: Option<String>,
    pub size: Option<String>,
    pub description: Option<String>,
    /// Base64 photo blob stored inline in the document.
    pub photo: Option<String>,
    pub shelter_id: String,
    pub adoption_status: AdoptionStatus,
    pub listed_at: BsonDateTime,
}

// ___ shelters collection ___
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Shelter {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub registered_at: BsonDateTime,
}

// ___ reminder_templates collection ___
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum ReminderCategory {
    Vaccination,
    #[serde(rename = "Health Check")]
    HealthCheck,
}

impl ReminderCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderCategory::Vaccination => "Vaccination",
            ReminderCategory::HealthCheck => "Health Check",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReminderTemplate {
    #[serde(rename = "_id")]
    pub id: String,
    pub shelter_id: String,
    pub title: String,
    pub category: ReminderCategory,
    pub days_after_adoption: i64,
    pub active: bool,
}

// ___ care_reminders collection ___
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum ReminderStatus {
    Pending,
    Completed,
    Disabled,
}

impl ReminderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderStatus::Pending => "Pending",
            ReminderStatus::Completed => "Completed",
            ReminderStatus::Disabled => "Disabled",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReminderSource {
    System,
    Shelter,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CareReminder {
    #[serde(rename = "_id")]
    pub id: String,
    pub pet_id: String,
    pub adopter_id: String,
    pub template_id: String,
    pub title: String,
    pub category: ReminderCategory,
    pub due_date: BsonDateTime,
    pub status: ReminderStatus,
    pub created_by: ReminderSource,
    pub created_at: BsonDateTime,
}

// ___ reports collection ___
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum ReportStatus {
    Pending,
    Investigating,
    Rescued,
    Rejected,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "Pending",
            ReportStatus::Investigating => "Investigating",
            ReportStatus::Rescued => "Rescued",
            ReportStatus::Rejected => "Rejected",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Report {
    #[serde(rename = "_id")]
    pub id: String,
    pub reporter_name: Option<String>,
    pub reporter_phone: Option<String>,
    pub description: String,
    pub location: String,
    pub photo: Option<String>,
    pub status: ReportStatus,
    pub reported_at: BsonDateTime,
}

// ___ chat_histories collection ___
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// One document per chat session, `_id` = session key (adopter id or an
/// anonymous session id). Capped at the 20 most recent messages on write.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatHistory {
    #[serde(rename = "_id")]
    pub id: String,
    pub messages: Vec<ChatMessage>,
}

// ___ vet_clinics collection ___
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GeoPoint {
    #[serde(rename = "type")]
    pub point_type: String,
    /// [longitude, latitude]
    pub coordinates: [f64; 2],
}

impl GeoPoint {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self {
            point_type: "Point".into(),
            coordinates: [lng, lat],
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct VetClinic {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub location: GeoPoint,
}

#[cfg(test)]
mod tests {
    use super::*;

    // Status enums are queried with string literals in doc! filters, so the
    // serde spelling must match `as_str` exactly for every variant.
    fn spelling<T: serde::Serialize>(v: &T) -> String {
        match serde_json::to_value(v).unwrap() {
            serde_json::Value::String(s) => s,
            other => panic!("expected string, got {other}"),
        }
    }

    #[test]
    fn request_status_wire_spelling() {
        for s in [
            RequestStatus::Pending,
            RequestStatus::Approved,
            RequestStatus::Rejected,
        ] {
            assert_eq!(spelling(&s), s.as_str());
        }
    }

    #[test]
    fn adoption_status_wire_spelling() {
        for s in [
            AdoptionStatus::Available,
            AdoptionStatus::Pending,
            AdoptionStatus::Adopted,
        ] {
            assert_eq!(spelling(&s), s.as_str());
        }
    }

    #[test]
    fn reminder_status_wire_spelling() {
        for s in [
            ReminderStatus::Pending,
            ReminderStatus::Completed,
            ReminderStatus::Disabled,
        ] {
            assert_eq!(spelling(&s), s.as_str());
        }
    }

    #[test]
    fn reminder_category_wire_spelling() {
        assert_eq!(spelling(&ReminderCategory::Vaccination), "Vaccination");
        assert_eq!(spelling(&ReminderCategory::HealthCheck), "Health Check");
    }

    #[test]
    fn report_status_wire_spelling() {
        for s in [
            ReportStatus::Pending,
            ReportStatus::Investigating,
            ReportStatus::Rescued,
            ReportStatus::Rejected,
        ] {
            assert_eq!(spelling(&s), s.as_str());
        }
    }

    #[test]
    fn created_by_and_roles_are_lowercase() {
        assert_eq!(spelling(&ReminderSource::System), "system");
        assert_eq!(spelling(&ReminderSource::Shelter), "shelter");
        assert_eq!(spelling(&ChatRole::User), "user");
        assert_eq!(spelling(&ChatRole::Assistant), "assistant");
    }
}
