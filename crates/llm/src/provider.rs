use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use core::{ChatMessage, ChatRole, ToolCall};
use error::{CodeqaError, Result};

use crate::config::LlmConfig;
use crate::normalize::normalize_inline_tool_call;
use crate::provider_err;
use crate::stream::TextFragmentStream;
use crate::LanguageModel;

/// A tool's JSON-schema advertisement to the model (§4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Result of a single (non-streaming) chat turn: either final content,
/// or one or more tool calls the orchestrator must execute before
/// resuming the loop.
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl ChatOutcome {
    pub fn is_tool_call(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    function: WireFunctionCall,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct WireFunctionSpec {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunctionSpec,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoiceResponse>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceResponse {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
    index: usize,
}

fn role_str(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
        ChatRole::System => "system",
        ChatRole::Tool => "tool",
    }
}

fn to_wire_messages(messages: &[ChatMessage]) -> Vec<WireMessage> {
    messages
        .iter()
        .map(|m| WireMessage {
            role: role_str(m.role),
            content: m.content.clone(),
            tool_call_id: m.tool_call_id.clone(),
            tool_calls: m.tool_calls.as_ref().map(|calls| {
                calls
                    .iter()
                    .map(|c| WireToolCall {
                        id: c.id.clone(),
                        kind: "function".to_string(),
                        function: WireFunctionCall {
                            name: c.function_name.clone(),
                            arguments: c.arguments.clone(),
                        },
                    })
                    .collect()
            }),
        })
        .collect()
}

/// OpenAI-compatible provider implementation of [`LanguageModel`].
/// Retries transient failures with a fixed backoff, per the teacher's
/// `LLMClient::chat`, upgraded here to async.
pub struct LlmClient {
    config: LlmConfig,
    http: reqwest::Client,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| provider_err(format!("failed to build http client: {e}")))?;
        Ok(Self { config, http })
    }

    async fn chat_attempt(&self, messages: &[ChatMessage], tools: &[ToolSpec]) -> Result<ChatOutcome> {
        let req = ChatRequest {
            model: self.config.chat_model.clone(),
            messages: to_wire_messages(messages),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            tools: tools
                .iter()
                .map(|t| WireTool {
                    kind: "function",
                    function: WireFunctionSpec {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.parameters.clone(),
                    },
                })
                .collect(),
            stream: false,
        };

        let resp = self
            .http
            .post(self.config.chat_url())
            .bearer_auth(&self.config.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| provider_err(format!("chat request failed: {e}")))?;

        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(provider_err(format!(
                "chat request returned {status}: {text}"
            )));
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| provider_err(format!("malformed chat response: {e}; body={text}")))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| provider_err("chat response had no choices"))?;

        if let Some(native_calls) = choice.message.tool_calls.filter(|c| !c.is_empty()) {
            let tool_calls = native_calls
                .into_iter()
                .map(|c| ToolCall {
                    id: c.id,
                    function_name: c.function.name,
                    arguments: c.function.arguments,
                })
                .collect();
            return Ok(ChatOutcome {
                content: choice.message.content,
                tool_calls,
            });
        }

        // Provider lacks native tool calls: check for an inline JSON call.
        if let Some(content) = &choice.message.content {
            if !tools.is_empty() {
                if let Some(call) = normalize_inline_tool_call(content, tools) {
                    return Ok(ChatOutcome {
                        content: None,
                        tool_calls: vec![call],
                    });
                }
            }
        }

        Ok(ChatOutcome {
            content: choice.message.content,
            tool_calls: Vec::new(),
        })
    }

    async fn embed_attempt(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let req = EmbeddingRequest {
            model: &self.config.embedding_model,
            input: texts,
        };

        let resp = self
            .http
            .post(self.config.embeddings_url())
            .bearer_auth(&self.config.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| provider_err(format!("embed request failed: {e}")))?;

        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(provider_err(format!(
                "embed request returned {status}: {text}"
            )));
        }

        let parsed: EmbeddingResponse = serde_json::from_str(&text)
            .map_err(|e| provider_err(format!("malformed embed response: {e}; body={text}")))?;

        let mut ordered: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        for datum in parsed.data {
            if let Some(slot) = ordered.get_mut(datum.index) {
                *slot = Some(datum.embedding);
            }
        }

        ordered
            .into_iter()
            .enumerate()
            .map(|(i, v)| v.ok_or_else(|| provider_err(format!("embed response missing index {i}"))))
            .collect()
    }

    async fn with_retries<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut last_err: Option<CodeqaError> = None;
        for attempt in 0..self.config.max_retries {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    warn!(attempt, error = %e, "llm provider call failed");
                    last_err = Some(e);
                    if attempt + 1 < self.config.max_retries {
                        tokio::time::sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
                    }
                }
            }
        }
        Err(last_err.unwrap_or_else(|| provider_err("all retries exhausted")))
    }
}

#[async_trait::async_trait]
impl LanguageModel for LlmClient {
    async fn chat(&self, messages: &[ChatMessage], tools: &[ToolSpec]) -> Result<ChatOutcome> {
        debug!(n = messages.len(), "sending chat request");
        self.with_retries(|| self.chat_attempt(messages, tools)).await
    }

    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        cancel: tokio_util::sync::CancellationToken,
    ) -> Result<TextFragmentStream> {
        crate::stream::stream_chat_completions(&self.http, &self.config, messages, cancel).await
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let texts = vec![text.to_string()];
        let mut out = self.embed_batch(&texts).await?;
        out.pop().ok_or_else(|| provider_err("embed returned no vectors"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let limit = self.config.embed_batch_limit.max(1);
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(limit) {
            let owned: Vec<String> = chunk.to_vec();
            let embeddings = self.with_retries(|| self.embed_attempt(&owned)).await?;
            out.extend(embeddings);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_outcome_is_tool_call_reflects_presence_of_calls() {
        let outcome = ChatOutcome {
            content: None,
            tool_calls: vec![ToolCall {
                id: "1".into(),
                function_name: "code_search".into(),
                arguments: "{}".into(),
            }],
        };
        assert!(outcome.is_tool_call());

        let outcome = ChatOutcome {
            content: Some("done".into()),
            tool_calls: Vec::new(),
        };
        assert!(!outcome.is_tool_call());
    }

    #[test]
    fn role_str_matches_openai_wire_names() {
        assert_eq!(role_str(ChatRole::User), "user");
        assert_eq!(role_str(ChatRole::Tool), "tool");
    }
}
