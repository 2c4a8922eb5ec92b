//! Chat turn and transcript handlers

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use cupid_common::{auth::CallerIdentity, db::models::ChatMessage, errors::Result};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Serialize)]
pub struct ChatReply {
    pub reply: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message_id: Uuid,
    pub sender: String,
    pub content: String,
    pub created_at: String,
}

impl From<ChatMessage> for MessageResponse {
    fn from(message: ChatMessage) -> Self {
        Self {
            message_id: message.message_id,
            sender: message.role,
            content: message.content,
            created_at: message.created_at.to_rfc3339(),
        }
    }
}

/// Run one chat turn against a session id or paper code.
pub async fn post_turn(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(raw_identifier): Path<String>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatReply>> {
    let reply = state
        .chat
        .handle_turn(caller.owner_id, &raw_identifier, &request.message)
        .await?;
    Ok(Json(ChatReply { reply }))
}

/// Fetch the transcript behind a session id or paper code, oldest first.
pub async fn list_messages(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(raw_identifier): Path<String>,
) -> Result<Json<Vec<MessageResponse>>> {
    let messages = state
        .chat
        .transcript(caller.owner_id, &raw_identifier)
        .await?;
    Ok(Json(messages.into_iter().map(Into::into).collect()))
}
