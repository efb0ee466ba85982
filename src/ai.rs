//! Client for the generative-language API backing label suggestion and the
//! chatbot. Speaks the OpenAI-compatible chat-completions wire format, so any
//! compatible endpoint works.

use std::time::Duration;

use reqwest::{header, Client};
use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    error::AppError,
    models::{ChatMessage, ChatRole},
};

pub struct AiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

impl AiClient {
    pub fn from_config(config: &Config) -> Self {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.ai_timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: config.ai_base_url.clone(),
            api_key: config.ai_api_key.clone(),
            model: config.ai_model.clone(),
        }
    }

    /// Send a system prompt plus conversation history and return the model's
    /// reply text.
    pub async fn complete(
        &self,
        system_prompt: &str,
        history: &[ChatMessage],
    ) -> Result<String, AppError> {
        let mut messages = vec![WireMessage {
            role: "system",
            content: system_prompt,
        }];
        for m in history {
            messages.push(WireMessage {
                role: match m.role {
                    ChatRole::User => "user",
                    ChatRole::Assistant => "assistant",
                },
                content: &m.content,
            });
        }

        let request = CompletionRequest {
            model: &self.model,
            messages,
        };

        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response: CompletionResponse =
            builder.send().await?.error_for_status()?.json().await?;

        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AppError::BadUpstreamReply("response contained no choices".into()))
    }
}

/// Pull the first JSON object out of a model reply. Models wrap JSON in
/// markdown fences or lead-in prose often enough that a bare
/// `serde_json::from_str` on the whole reply is not reliable.
pub fn extract_json_object(reply: &str) -> Option<serde_json::Value> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&reply[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_bare_json() {
        let v = extract_json_object(r#"{"species":"dog","breed":"beagle"}"#).unwrap();
        assert_eq!(v["species"], "dog");
    }

    #[test]
    fn extracts_fenced_json() {
        let reply = "```json\n{\"species\": \"cat\", \"colors\": [\"black\"]}\n```";
        let v = extract_json_object(reply).unwrap();
        assert_eq!(v["colors"][0], "black");
    }

    #[test]
    fn extracts_json_with_leadin_prose() {
        let reply = "Sure! Here are the labels:\n{\"species\": \"rabbit\"}\nLet me know.";
        // trailing prose has no closing brace, so rfind('}') still lands on
        // the object
        let v = extract_json_object(reply).unwrap();
        assert_eq!(v["species"], "rabbit");
    }

    #[test]
    fn rejects_reply_without_json() {
        assert!(extract_json_object("I could not identify the animal.").is_none());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(extract_json_object("{\"species\": ").is_none());
    }
}
