//! Language-model adapter (C1, §4.1).
//!
//! Presents a uniform `chat`/`streamChat`/`embed`/`embedBatch` contract
//! over a pluggable OpenAI-compatible provider. Providers that emit tool
//! calls as inline JSON rather than native tool-call fields are
//! normalized here so that downstream code only ever sees one shape.

mod config;
mod normalize;
mod provider;
mod stream;

pub use config::LlmConfig;
pub use normalize::normalize_inline_tool_call;
pub use provider::{ChatOutcome, LlmClient, ToolSpec};
pub use stream::TextFragmentStream;

use core::ChatMessage;
use error::{CodeqaError, Result};

/// The adapter trait downstream components (C5/C6/C7) program against.
/// `LlmClient` is the concrete OpenAI-compatible implementation; tests
/// substitute a fake.
#[async_trait::async_trait]
pub trait LanguageModel: Send + Sync {
    async fn chat(&self, messages: &[ChatMessage], tools: &[ToolSpec]) -> Result<ChatOutcome>;

    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        cancel: tokio_util::sync::CancellationToken,
    ) -> Result<TextFragmentStream>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Splits batches larger than the provider's cap transparently,
    /// preserving input order in the returned vector.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

pub(crate) fn provider_err(message: impl Into<String>) -> CodeqaError {
    CodeqaError::provider(message.into())
}
