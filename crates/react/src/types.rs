use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use common::ConversationId;
use core::Citation;

/// Hard cap on agent-loop iterations (§4.7). Exhaustion finalizes with
/// `is_complete = false`, never an error (§7).
pub const MAX_ITERATIONS: usize = 10;

/// `observation.content` is truncated to this many characters with an
/// ellipsis suffix (§6.2).
pub const OBSERVATION_TRUNCATE_LEN: usize = 500;

/// At most this many citation events are emitted on the streaming path
/// (§4.7 Finalize).
pub const MAX_STREAM_CITATIONS: usize = 10;

/// One step of the agent's reasoning trace, accumulated for the
/// non-streaming response (§4.7).
#[derive(Debug, Clone, Serialize)]
pub struct ReasoningStep {
    pub step_number: usize,
    pub thought: String,
    pub action: String,
    pub action_input: String,
    pub observation: String,
}

/// The non-streaming result of `/api/agent/chat` (§6.1).
#[derive(Debug, Clone, Serialize)]
pub struct AgentResponse {
    pub conversation_id: ConversationId,
    pub content: String,
    pub citations: Vec<Citation>,
    pub citation_map: HashMap<String, usize>,
    pub reasoning_steps: Vec<ReasoningStep>,
    pub is_complete: bool,
}

/// Streaming event kinds (§6.2). Ordering for one request respects
/// `action ≺ observation ≺ answer ≺ citation ≺ done`; nothing follows
/// `done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Action,
    Observation,
    Answer,
    Citation,
    Done,
}

#[derive(Debug, Clone, Serialize)]
pub struct StreamEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citation: Option<Citation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,
}

impl StreamEvent {
    /// `action.content` is a JSON string `{tool, input}` (§6.2).
    pub fn action(tool: &str, input: &str) -> Self {
        let content = serde_json::json!({"tool": tool, "input": input}).to_string();
        Self { event_type: EventType::Action, content, citation: None, conversation_id: None }
    }

    /// `observation.content` is truncated to `OBSERVATION_TRUNCATE_LEN`
    /// characters with an ellipsis suffix when truncated (§6.2).
    pub fn observation(content: &str) -> Self {
        let truncated = if content.chars().count() > OBSERVATION_TRUNCATE_LEN {
            let head: String = content.chars().take(OBSERVATION_TRUNCATE_LEN).collect();
            format!("{head}...")
        } else {
            content.to_string()
        };
        Self { event_type: EventType::Observation, content: truncated, citation: None, conversation_id: None }
    }

    pub fn answer(fragment: impl Into<String>) -> Self {
        Self { event_type: EventType::Answer, content: fragment.into(), citation: None, conversation_id: None }
    }

    pub fn citation(citation: Citation) -> Self {
        Self { event_type: EventType::Citation, content: String::new(), citation: Some(citation), conversation_id: None }
    }

    pub fn done(conversation_id: ConversationId) -> Self {
        Self { event_type: EventType::Done, content: String::new(), citation: None, conversation_id: Some(conversation_id) }
    }
}

/// Selects the orchestration strategy (§E6/§9 Open Question): the
/// canonical tool-using loop, or the pure-RAG single-call degradation.
/// Chosen per request via `ChatRequest::mode` (§6.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AskMode {
    #[default]
    React,
    Rag,
}
