//! Endpoints backed by the generative-language API: label suggestion for
//! listings/reports and the adoption-help chatbot.

use actix_web::{get, post, web, HttpResponse};
use bson::doc;
use mongodb::Database;
use serde::Deserialize;
use serde_json::json;

use crate::{
    ai::{extract_json_object, AiClient},
    error::AppError,
    models::{ChatHistory, ChatMessage, ChatRole},
};

/// Chat sessions keep only this many messages server-side.
pub const CHAT_HISTORY_CAP: i64 = 20;

const LABEL_PROMPT: &str = "You label animal descriptions for a pet adoption \
site. Reply with a single JSON object with keys \"species\", \"breed\", \
\"colors\" (array of strings) and \"estimated_age\". Use null for anything \
you cannot tell. No other text.";

const CHAT_PROMPT: &str = "You are the assistant for a pet adoption platform. \
Answer questions about adopting, caring for pets and using the site. Be \
brief and friendly.";

#[derive(Deserialize)]
pub struct SuggestLabelsPayload {
    pub description: String,
}

#[derive(Deserialize)]
pub struct ChatPayload {
    pub session_id: String,
    pub message: String,
}

#[post("/ai/labels")]
pub async fn suggest_labels(
    ai: web::Data<AiClient>,
    payload: web::Json<SuggestLabelsPayload>,
) -> Result<HttpResponse, AppError> {
    let p = payload.into_inner();
    if p.description.trim().is_empty() {
        return Err(AppError::Validation("description is required".into()));
    }

    let reply = ai
        .complete(
            LABEL_PROMPT,
            &[ChatMessage {
                role: ChatRole::User,
                content: p.description,
            }],
        )
        .await?;

    let labels = extract_json_object(&reply).ok_or_else(|| {
        AppError::BadUpstreamReply(format!("reply was not parseable as labels: {reply}"))
    })?;

    Ok(HttpResponse::Ok().json(labels))
}

#[post("/chat")]
pub async fn chat(
    db: web::Data<Database>,
    ai: web::Data<AiClient>,
    payload: web::Json<ChatPayload>,
) -> Result<HttpResponse, AppError> {
    let p = payload.into_inner();
    if p.session_id.trim().is_empty() || p.message.trim().is_empty() {
        return Err(AppError::Validation(
            "session_id and message are required".into(),
        ));
    }

    let history_coll = db.collection::<ChatHistory>("chat_histories");

    let mut messages = history_coll
        .find_one(doc! { "_id": &p.session_id })
        .await?
        .map(|h| h.messages)
        .unwrap_or_default();

    messages.push(ChatMessage {
        role: ChatRole::User,
        content: p.message.clone(),
    });

    let reply = ai.complete(CHAT_PROMPT, &messages).await?;

    history_coll
        .update_one(
            doc! { "_id": &p.session_id },
            history_update(&p.message, &reply),
        )
        .upsert(true)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "reply": reply })))
}

#[get("/chat/{session_id}")]
pub async fn get_chat_history(
    db: web::Data<Database>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let session_id = path.into_inner();
    let history_coll = db.collection::<ChatHistory>("chat_histories");

    let history = history_coll
        .find_one(doc! { "_id": &session_id })
        .await?
        .unwrap_or(ChatHistory {
            id: session_id,
            messages: Vec::new(),
        });

    Ok(HttpResponse::Ok().json(history))
}

/// Appends the user/assistant pair while keeping the stored history at the
/// cap: `$slice` with a negative bound keeps the most recent entries.
fn history_update(user_message: &str, assistant_reply: &str) -> bson::Document {
    doc! {
        "$push": {
            "messages": {
                "$each": [
                    { "role": "user", "content": user_message },
                    { "role": "assistant", "content": assistant_reply },
                ],
                "$slice": -CHAT_HISTORY_CAP,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_update_caps_at_twenty_most_recent() {
        let update = history_update("hello", "hi there");
        let push = update
            .get_document("$push")
            .unwrap()
            .get_document("messages")
            .unwrap();
        assert_eq!(push.get_i64("$slice").unwrap(), -20);
        assert_eq!(push.get_array("$each").unwrap().len(), 2);
    }

    #[test]
    fn history_update_appends_user_then_assistant() {
        let update = history_update("q", "a");
        let each = update
            .get_document("$push")
            .unwrap()
            .get_document("messages")
            .unwrap()
            .get_array("$each")
            .unwrap();
        let first = each[0].as_document().unwrap();
        let second = each[1].as_document().unwrap();
        assert_eq!(first.get_str("role").unwrap(), "user");
        assert_eq!(second.get_str("role").unwrap(), "assistant");
    }
}
