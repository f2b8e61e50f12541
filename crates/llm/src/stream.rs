use std::pin::Pin;

use futures::{Stream, StreamExt};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use core::ChatMessage;
use error::Result;

use crate::config::LlmConfig;
use crate::provider_err;

/// A lazy sequence of text fragments from `streamChat` (§4.1). Boxed
/// because the concrete type is an `async-stream` generator.
pub type TextFragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Parses one SSE `data:` payload line into a text fragment, per the
/// OpenAI streaming wire format. Returns `None` for the terminal
/// `[DONE]` marker or a chunk carrying no content delta.
fn parse_sse_data_line(line: &str) -> Option<Result<String>> {
    let payload = line.strip_prefix("data:")?.trim();
    if payload.is_empty() || payload == "[DONE]" {
        return None;
    }
    match serde_json::from_str::<StreamChunk>(payload) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.delta.content)
            .filter(|s| !s.is_empty())
            .map(Ok),
        Err(e) => Some(Err(provider_err(format!("malformed stream chunk: {e}")))),
    }
}

pub(crate) async fn stream_chat_completions(
    http: &reqwest::Client,
    config: &LlmConfig,
    messages: &[ChatMessage],
    cancel: CancellationToken,
) -> Result<TextFragmentStream> {
    #[derive(serde::Serialize)]
    struct WireMsg {
        role: &'static str,
        content: String,
    }

    #[derive(serde::Serialize)]
    struct StreamRequest {
        model: String,
        messages: Vec<WireMsg>,
        temperature: f32,
        stream: bool,
    }

    fn role_str(role: core::ChatRole) -> &'static str {
        match role {
            core::ChatRole::User => "user",
            core::ChatRole::Assistant => "assistant",
            core::ChatRole::System => "system",
            core::ChatRole::Tool => "tool",
        }
    }

    let req = StreamRequest {
        model: config.chat_model.clone(),
        messages: messages
            .iter()
            .map(|m| WireMsg {
                role: role_str(m.role),
                content: m.content.clone(),
            })
            .collect(),
        temperature: config.temperature,
        stream: true,
    };

    let resp = http
        .post(config.chat_url())
        .bearer_auth(&config.api_key)
        .json(&req)
        .send()
        .await
        .map_err(|e| provider_err(format!("stream request failed: {e}")))?;

    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        return Err(provider_err(format!("stream request returned {status}: {text}")));
    }

    let byte_stream = resp.bytes_stream();

    let fragments = async_stream::try_stream! {
        tokio::pin!(byte_stream);
        let mut buf = String::new();
        while let Some(bytes) = byte_stream.next().await {
            if cancel.is_cancelled() {
                break;
            }
            let bytes = bytes.map_err(|e| provider_err(format!("stream body error: {e}")))?;
            buf.push_str(&String::from_utf8_lossy(&bytes));

            while let Some(pos) = buf.find('\n') {
                let line = buf[..pos].trim_end_matches('\r').to_string();
                buf.drain(..=pos);
                if line.is_empty() {
                    continue;
                }
                match parse_sse_data_line(&line) {
                    Some(Ok(fragment)) => yield fragment,
                    Some(Err(e)) => {
                        warn!(error = %e, "skipping malformed stream chunk");
                    }
                    None => {}
                }
            }
        }
    };

    Ok(Box::pin(fragments))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn done_marker_yields_no_fragment() {
        assert!(parse_sse_data_line("data: [DONE]").is_none());
    }

    #[test]
    fn content_delta_yields_fragment() {
        let line = r#"data: {"choices":[{"delta":{"content":"hel"}}]}"#;
        match parse_sse_data_line(line) {
            Some(Ok(s)) => assert_eq!(s, "hel"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn empty_delta_yields_nothing() {
        let line = r#"data: {"choices":[{"delta":{}}]}"#;
        assert!(parse_sse_data_line(line).is_none());
    }

    #[test]
    fn non_data_line_is_ignored() {
        assert!(parse_sse_data_line("event: ping").is_none());
    }
}
