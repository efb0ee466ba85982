pub mod adopters;
pub mod ai;
pub mod clinics;
pub mod pets;
pub mod reminders;
pub mod reports;
pub mod requests;
pub mod shelters;
pub mod templates;
