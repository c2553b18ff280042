//! Symptom chat endpoints (patients only).
//!
//! - `POST /api/chat`: ask about symptoms
//! - `GET /api/chat/conversations`: recent conversations
//! - `GET /api/chat/conversations/:id`: one conversation, oldest first

use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{parse_id, ApiContext, SessionContext};
use crate::models::{ConversationSummary, Role, SymptomExchange};
use crate::symptom_chat::{self, ChatReply, APOLOGY};

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub conversation_id: Option<Uuid>,
}

pub async fn send(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatReply>, ApiError> {
    let patient = session.require(Role::Patient)?;
    let answer = symptom_chat::ask(ctx.core.chat.as_ref(), &body.message).await?;

    let Some(text) = answer else {
        return Ok(Json(ChatReply {
            conversation_id: body.conversation_id,
            text: APOLOGY.to_string(),
            answered: false,
        }));
    };

    let conn = ctx.core.open_db()?;
    let exchange = symptom_chat::save_exchange(
        &conn,
        &patient.id,
        body.conversation_id,
        &body.message,
        &text,
    )?;
    Ok(Json(ChatReply {
        conversation_id: Some(exchange.conversation_id),
        text,
        answered: true,
    }))
}

pub async fn conversations(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<Vec<ConversationSummary>>, ApiError> {
    let patient = session.require(Role::Patient)?;
    let conn = ctx.core.open_db()?;
    Ok(Json(symptom_chat::conversation_history(&conn, &patient.id)?))
}

pub async fn conversation(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> Result<Json<Vec<SymptomExchange>>, ApiError> {
    let patient = session.require(Role::Patient)?;
    let conversation_id = parse_id(&id, "conversation")?;
    let conn = ctx.core.open_db()?;
    let exchanges = symptom_chat::load_conversation(&conn, &patient.id, &conversation_id)?;
    if exchanges.is_empty() {
        return Err(ApiError::NotFound("Conversation not found".into()));
    }
    Ok(Json(exchanges))
}
