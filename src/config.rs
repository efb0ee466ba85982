use std::{env, fmt::Display, str::FromStr};

use tracing::{info, warn};

pub struct Config {
    pub port: u16,
    pub mongodb_uri: String,
    pub db_name: String,
    /// OpenAI-compatible completion endpoint for label suggestion and chat.
    pub ai_base_url: String,
    pub ai_api_key: Option<String>,
    pub ai_model: String,
    pub ai_timeout_secs: u64,
    /// Public contact shown by GET /api/contact. Configuration, not a
    /// specially-flagged shelter document.
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: String,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("PAWHAVEN_PORT", "8080"),
            mongodb_uri: try_load("MONGODB_URI", "mongodb://127.0.0.1:27017"),
            db_name: try_load("PAWHAVEN_DB", "pawhaven"),
            ai_base_url: try_load("AI_BASE_URL", "https://api.openai.com/v1"),
            ai_api_key: var("AI_API_KEY").ok(),
            ai_model: try_load("AI_MODEL", "gpt-4o-mini"),
            ai_timeout_secs: try_load("AI_TIMEOUT_SECS", "30"),
            contact_name: try_load("CONTACT_NAME", "Pawhaven Adoption Center"),
            contact_email: try_load("CONTACT_EMAIL", "contact@pawhaven.example"),
            contact_phone: try_load("CONTACT_PHONE", ""),
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}
