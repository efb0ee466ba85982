//! Pet adoption platform backend.
//!
//! Actix-web REST service over MongoDB: adopter and shelter accounts, pet
//! listings, the adoption-request workflow with care-reminder generation,
//! stray reports with rescue conversion, AI label suggestion and chat, and
//! geospatial vet-clinic lookup.

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use bson::doc;
use mongodb::{options::IndexOptions, Client, Database, IndexModel};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

pub mod ai;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod reminders;

use ai::AiClient;
use config::Config;

/// Secondary indexes the query paths rely on. Creation is idempotent.
pub async fn ensure_indexes(db: &Database) -> mongodb::error::Result<()> {
    db.collection::<models::Adopter>("adopters")
        .create_index(
            IndexModel::builder()
                .keys(doc! { "email": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build(),
        )
        .await?;

    let requests = db.collection::<models::AdoptionRequest>("adoption_requests");
    requests
        .create_index(
            IndexModel::builder()
                .keys(doc! { "pet_id": 1, "status": 1 })
                .build(),
        )
        .await?;
    requests
        .create_index(IndexModel::builder().keys(doc! { "shelter_id": 1 }).build())
        .await?;
    requests
        .create_index(IndexModel::builder().keys(doc! { "adopter_id": 1 }).build())
        .await?;

    db.collection::<models::CareReminder>("care_reminders")
        .create_index(
            IndexModel::builder()
                .keys(doc! { "pet_id": 1, "adopter_id": 1 })
                .build(),
        )
        .await?;

    db.collection::<models::VetClinic>("vet_clinics")
        .create_index(
            IndexModel::builder()
                .keys(doc! { "location": "2dsphere" })
                .build(),
        )
        .await?;

    Ok(())
}

pub async fn start_server() -> std::io::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = Config::load();

    let client = Client::with_uri_str(&config.mongodb_uri)
        .await
        .expect("failed to connect to MongoDB");
    let db = client.database(&config.db_name);

    ensure_indexes(&db).await.expect("failed to create indexes");

    let ai_client = web::Data::new(AiClient::from_config(&config));
    let address = ("0.0.0.0", config.port);
    let config = web::Data::new(config);

    info!("Server running on http://{}:{}", address.0, address.1);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(db.clone()))
            .app_data(config.clone())
            .app_data(ai_client.clone())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header(),
            )
            .service(
                web::scope("/api")
                    .service(handlers::adopters::register)
                    .service(handlers::adopters::login)
                    .service(handlers::adopters::get_adopter)
                    .service(handlers::adopters::update_preferences)
                    .service(handlers::adopters::get_adopted_pets)
                    .service(handlers::requests::create_request)
                    .service(handlers::requests::cancel_request)
                    .service(handlers::requests::get_adopter_requests)
                    .service(handlers::requests::get_shelter_requests)
                    .service(handlers::requests::approve_request)
                    .service(handlers::requests::reject_request)
                    .service(handlers::pets::list_pets)
                    .service(handlers::pets::get_pet)
                    .service(handlers::pets::list_shelter_pets)
                    .service(handlers::pets::create_pet)
                    .service(handlers::pets::update_pet)
                    .service(handlers::pets::delete_pet)
                    .service(handlers::shelters::register_shelter)
                    .service(handlers::shelters::get_public_contact)
                    .service(handlers::shelters::get_shelter)
                    .service(handlers::shelters::update_shelter)
                    .service(handlers::templates::list_templates)
                    .service(handlers::templates::create_template)
                    .service(handlers::templates::update_template)
                    .service(handlers::reminders::get_pet_reminders)
                    .service(handlers::reminders::update_reminder)
                    .service(handlers::reports::submit_report)
                    .service(handlers::reports::list_reports)
                    .service(handlers::reports::update_report_status)
                    .service(handlers::reports::rescue_report)
                    .service(handlers::ai::suggest_labels)
                    .service(handlers::ai::chat)
                    .service(handlers::ai::get_chat_history)
                    .service(handlers::clinics::nearby_clinics)
                    .service(handlers::clinics::create_clinic),
            )
    })
    .bind(address)?
    .run()
    .await
}
