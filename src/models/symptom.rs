use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One user message and the assistant's reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymptomExchange {
    pub id: Uuid,
    pub user_id: Uuid,
    pub conversation_id: Uuid,
    pub user_message: String,
    pub ai_response: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub conversation_id: Uuid,
    pub preview: String,
    pub exchange_count: u32,
    pub last_message_at: DateTime<Utc>,
}
