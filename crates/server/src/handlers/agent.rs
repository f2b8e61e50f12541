//! `/api/agent/*` handlers (§6.1): the chat endpoint (streaming and
//! non-streaming) and conversation lookup/deletion.

use std::convert::Infallible;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use common::{ConversationId, RepositoryId};
use core::ConversationContext;
use error::CodeqaError;
use react::{AgentResponse, AskMode};

use crate::api_error::ApiError;
use crate::state::AppState;

/// Body shared by the streaming and non-streaming chat endpoints (§6.1).
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub repository_id: RepositoryId,
    #[serde(default)]
    pub conversation_id: Option<ConversationId>,
    /// Orchestration strategy for this request (§9 Open Question);
    /// defaults to the canonical tool-using loop.
    #[serde(default)]
    pub mode: AskMode,
}

/// Non-empty `message`/`repositoryId`, else 400 (§6.1).
fn validate(req: &ChatRequest) -> Result<(), CodeqaError> {
    if req.message.trim().is_empty() {
        return Err(CodeqaError::validation("message must not be empty"));
    }
    if req.repository_id.as_str().trim().is_empty() {
        return Err(CodeqaError::validation("repository_id must not be empty"));
    }
    Ok(())
}

/// `POST /api/agent/chat`.
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<AgentResponse>, ApiError> {
    validate(&req)?;
    let response = state
        .agent
        .ask_with_mode(&req.repository_id, req.conversation_id.as_ref(), &req.message, req.mode)
        .await?;
    Ok(Json(response))
}

/// `POST /api/agent/chat/stream`. Each `StreamEvent` is framed as one SSE
/// event named after its `type` field (§6.2).
pub async fn chat_stream(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    validate(&req)?;

    let cancel = CancellationToken::new();
    let events = state.agent.clone().ask_stream(req.repository_id, req.conversation_id, req.message, cancel);

    let sse_stream = events.map(|event| match event {
        Ok(event) => {
            let name = format!("{:?}", event.event_type).to_lowercase();
            let data = serde_json::to_string(&event).unwrap_or_default();
            Ok(Event::default().event(name).data(data))
        }
        Err(e) => {
            tracing::error!(error = %e, "agent stream failed");
            let data = serde_json::json!({"error": e.to_string()}).to_string();
            Ok(Event::default().event("error").data(data))
        }
    });

    Ok(Sse::new(sse_stream).keep_alive(KeepAlive::default()))
}

/// `GET /api/agent/conversations/{id}`.
pub async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<ConversationId>,
) -> Result<Json<ConversationContext>, ApiError> {
    let conversation = state
        .conversations
        .get(&id)
        .await?
        .ok_or_else(|| CodeqaError::not_found(format!("conversation {id}")))?;
    Ok(Json(conversation))
}

/// `DELETE /api/agent/conversations/{id}`.
pub async fn delete_conversation(
    State(state): State<AppState>,
    Path(id): Path<ConversationId>,
) -> Result<StatusCode, ApiError> {
    state.conversations.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
