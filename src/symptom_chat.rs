//! Symptom analyser: one model call per message, exchanges saved per
//! conversation.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::GeminiConfig;
use crate::db::{repository, DatabaseError};
use crate::models::*;

pub const MAX_MESSAGE_CHARS: usize = 2000;
pub const HISTORY_LIMIT: u32 = 10;
const PREVIEW_CHARS: usize = 50;

/// Shown to the user whenever the model call fails.
pub const APOLOGY: &str = "I'm sorry, I'm experiencing some technical difficulties right now. \
Please try again in a moment, or if you have urgent symptoms, please contact your healthcare \
provider or emergency services immediately.";

pub const SYSTEM_PROMPT: &str = "You are HealthBell AI, a medical symptom analyzer assistant. \
You provide helpful, accurate, and empathetic responses about health symptoms while \
following these guidelines:

1. ALWAYS remind users that you are not a replacement for professional medical advice
2. For serious symptoms, ALWAYS recommend seeking immediate medical attention
3. Ask clarifying questions to better understand symptoms
4. Provide general information about possible causes and when to see a doctor
5. Be empathetic and reassuring while being medically responsible
6. Do not provide specific diagnoses or prescribe treatments
7. Focus on symptom assessment, general health information, and when to seek medical care
8. If symptoms sound emergency-related, emphasize seeking immediate medical attention

Keep responses concise but informative, and always maintain a caring, professional tone.";

const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Please describe your symptoms")]
    EmptyMessage,

    #[error("Message too long: {0} characters (max {MAX_MESSAGE_CHARS})")]
    MessageTooLong(usize),

    #[error("AI service key not configured")]
    MissingApiKey,

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("AI service returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Invalid response from AI service: {0}")]
    ResponseParsing(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Text generation backend (allows mocking).
#[async_trait]
pub trait SymptomModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ChatError>;
}

pub fn build_prompt(message: &str) -> String {
    format!("{SYSTEM_PROMPT}\n\nUser Query: {message}")
}

pub fn validate_message(raw: &str) -> Result<&str, ChatError> {
    let message = raw.trim();
    if message.is_empty() {
        return Err(ChatError::EmptyMessage);
    }
    let chars = message.chars().count();
    if chars > MAX_MESSAGE_CHARS {
        return Err(ChatError::MessageTooLong(chars));
    }
    Ok(message)
}

// ─── Gemini client ───────────────────────────────────────

pub struct GeminiClient {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

fn request_body(prompt: &str) -> GenerateRequest<'_> {
    GenerateRequest {
        contents: [Content {
            parts: [Part { text: prompt }],
        }],
        generation_config: GenerationConfig {
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 1024,
        },
        safety_settings: SAFETY_CATEGORIES
            .into_iter()
            .map(|category| SafetySetting {
                category,
                threshold: "BLOCK_MEDIUM_AND_ABOVE",
            })
            .collect(),
    }
}

/// First part of the first candidate.
fn reply_text(response: GenerateResponse) -> Result<String, ChatError> {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .ok_or_else(|| ChatError::ResponseParsing("No valid response received".into()))
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Result<Self, ChatError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ChatError::HttpClient(e.to_string()))?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            client,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl SymptomModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, ChatError> {
        let api_key = self.api_key.as_deref().ok_or(ChatError::MissingApiKey)?;

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", api_key)])
            .json(&request_body(prompt))
            .send()
            .await
            .map_err(|e| ChatError::HttpClient(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ChatError::ResponseParsing(e.without_url().to_string()))?;
        reply_text(parsed)
    }
}

/// Mock model for testing: echoes a fixed reply or fails.
pub struct MockSymptomModel {
    reply: Option<String>,
}

impl MockSymptomModel {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
        }
    }

    pub fn failing() -> Self {
        Self { reply: None }
    }
}

#[async_trait]
impl SymptomModel for MockSymptomModel {
    async fn generate(&self, _prompt: &str) -> Result<String, ChatError> {
        self.reply.clone().ok_or(ChatError::Upstream {
            status: 500,
            body: "mock failure".into(),
        })
    }
}

// ─── Conversations ───────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub conversation_id: Option<Uuid>,
    pub text: String,
    /// False when the apology was returned instead of a model answer.
    pub answered: bool,
}

/// Ask the model. Failures come back as the apology with `answered`
/// unset; nothing is stored for them.
pub async fn ask(model: &dyn SymptomModel, message: &str) -> Result<Option<String>, ChatError> {
    let message = validate_message(message)?;
    match model.generate(&build_prompt(message)).await {
        Ok(text) => Ok(Some(text)),
        Err(e) => {
            tracing::warn!(error = %e, "Symptom model call failed");
            Ok(None)
        }
    }
}

pub fn save_exchange(
    conn: &Connection,
    user_id: &Uuid,
    conversation_id: Option<Uuid>,
    user_message: &str,
    ai_response: &str,
) -> Result<SymptomExchange, ChatError> {
    let exchange = SymptomExchange {
        id: Uuid::new_v4(),
        user_id: *user_id,
        conversation_id: conversation_id.unwrap_or_else(Uuid::new_v4),
        user_message: user_message.trim().to_string(),
        ai_response: ai_response.to_string(),
        created_at: Utc::now(),
    };
    repository::insert_exchange(conn, &exchange)?;
    Ok(exchange)
}

fn preview(message: &str) -> String {
    let head: String = message.chars().take(PREVIEW_CHARS).collect();
    format!("{head}...")
}

/// Group recent exchanges (newest first) by conversation, keeping first-seen
/// order. The preview comes from the newest message in each conversation.
pub fn summarize_conversations(recent: &[SymptomExchange]) -> Vec<ConversationSummary> {
    let mut order: Vec<Uuid> = Vec::new();
    let mut summaries: HashMap<Uuid, ConversationSummary> = HashMap::new();
    for exchange in recent {
        summaries
            .entry(exchange.conversation_id)
            .and_modify(|s| s.exchange_count += 1)
            .or_insert_with(|| {
                order.push(exchange.conversation_id);
                ConversationSummary {
                    conversation_id: exchange.conversation_id,
                    preview: preview(&exchange.user_message),
                    exchange_count: 1,
                    last_message_at: exchange.created_at,
                }
            });
    }
    order.into_iter().filter_map(|id| summaries.remove(&id)).collect()
}

pub fn conversation_history(
    conn: &Connection,
    user_id: &Uuid,
) -> Result<Vec<ConversationSummary>, ChatError> {
    let recent = repository::get_recent_exchanges(conn, user_id, HISTORY_LIMIT)?;
    Ok(summarize_conversations(&recent))
}

pub fn load_conversation(
    conn: &Connection,
    user_id: &Uuid,
    conversation_id: &Uuid,
) -> Result<Vec<SymptomExchange>, ChatError> {
    Ok(repository::get_conversation_exchanges(conn, user_id, conversation_id)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn message_bounds() {
        assert!(matches!(validate_message("  "), Err(ChatError::EmptyMessage)));
        let long = "a".repeat(MAX_MESSAGE_CHARS + 1);
        assert!(matches!(validate_message(&long), Err(ChatError::MessageTooLong(2001))));
        assert_eq!(validate_message(" headache ").unwrap(), "headache");
    }

    #[test]
    fn request_carries_generation_and_safety_settings() {
        let body = serde_json::to_value(request_body(&build_prompt("cough"))).unwrap();
        let text = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("You are HealthBell AI"));
        assert!(text.ends_with("\n\nUser Query: cough"));
        assert_eq!(body["generationConfig"]["topK"], 40);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 1024);
        assert_eq!(body["safetySettings"].as_array().unwrap().len(), 4);
        assert_eq!(body["safetySettings"][3]["threshold"], "BLOCK_MEDIUM_AND_ABOVE");
    }

    #[test]
    fn reply_is_first_candidate_part() {
        let parsed: GenerateResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": {"parts": [{"text": "Rest and fluids."}, {"text": "ignored"}]}
            }]
        }))
        .unwrap();
        assert_eq!(reply_text(parsed).unwrap(), "Rest and fluids.");

        let empty: GenerateResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(matches!(reply_text(empty), Err(ChatError::ResponseParsing(_))));
    }

    #[test]
    fn endpoint_includes_model() {
        let client = GeminiClient::new(&GeminiConfig {
            base_url: "https://ai.example/v1beta/".into(),
            model: "gemini-1.5-flash".into(),
            api_key: None,
        })
        .unwrap();
        assert_eq!(
            client.endpoint(),
            "https://ai.example/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[tokio::test]
    async fn model_failure_yields_none() {
        assert_eq!(ask(&MockSymptomModel::failing(), "fever").await.unwrap(), None);
        assert_eq!(
            ask(&MockSymptomModel::new("See a doctor."), "fever").await.unwrap().as_deref(),
            Some("See a doctor.")
        );
    }

    #[test]
    fn history_groups_by_conversation() {
        let conn = open_memory_database().unwrap();
        let user = fixtures::user(&conn, "Ana", Role::Patient);
        let opening = "I have had a sore throat for three days and it is getting worse";
        let first = save_exchange(&conn, &user.id, None, opening, "r1").unwrap();
        save_exchange(&conn, &user.id, Some(first.conversation_id), "also a fever", "r2").unwrap();
        save_exchange(&conn, &user.id, None, "knee pain", "r3").unwrap();

        let history = conversation_history(&conn, &user.id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].preview, "knee pain...");
        assert_eq!(history[1].conversation_id, first.conversation_id);
        assert_eq!(history[1].exchange_count, 2);
        assert_eq!(history[1].preview, "also a fever...");

        let thread = load_conversation(&conn, &user.id, &first.conversation_id).unwrap();
        assert_eq!(thread.len(), 2);
        assert_eq!(thread[0].ai_response, "r1");
    }

    #[test]
    fn preview_truncates_on_characters() {
        let long = "é".repeat(60);
        assert_eq!(preview(&long).chars().count(), PREVIEW_CHARS + 3);
    }
}
