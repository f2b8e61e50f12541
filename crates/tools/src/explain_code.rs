//! `explain_code` tool (§4.6): a thin C1 call asking the model to
//! explain an inline snippet at a requested detail level.

use async_trait::async_trait;
use serde_json::{json, Value};

use core::ChatMessage;
use toolkit::{parse_string, parse_string_opt, Tool, ToolContext, ToolOutput};

fn system_prompt(detail_level: &str) -> String {
    let guidance = match detail_level {
        "brief" => "Explain in one or two sentences, no code repetition.",
        "comprehensive" => "Explain thoroughly: purpose, control flow, edge cases, and any non-obvious design choices.",
        _ => "Explain clearly in a short paragraph, covering what the code does and why it matters.",
    };
    format!("You are a code explainer. {guidance}")
}

pub struct ExplainCodeTool;

#[async_trait]
impl Tool for ExplainCodeTool {
    fn name(&self) -> &str {
        "explain_code"
    }

    fn description(&self) -> &str {
        "Explain an inline code snippet at a requested level of detail."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "required": ["code"],
            "properties": {
                "code": {"type": "string", "description": "The code snippet to explain"},
                "detail_level": {"type": "string", "description": "brief|detailed|comprehensive", "default": "detailed"}
            }
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolOutput {
        let code = match parse_string(&args, "code") {
            Ok(c) => c,
            Err(e) => return ToolOutput::error(e),
        };
        let detail_level = parse_string_opt(&args, "detail_level").unwrap_or_else(|| "detailed".to_string());

        let messages = vec![
            ChatMessage::system(system_prompt(&detail_level)),
            ChatMessage::user(code),
        ];

        match ctx.model.chat(&messages, &[]).await {
            Ok(outcome) => ToolOutput::success(outcome.content.unwrap_or_default()),
            Err(e) => ToolOutput::error(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use common::RepositoryId;
    use llm::{ChatOutcome, LanguageModel, TextFragmentStream, ToolSpec};
    use store::{MemoryStore, Store};

    struct StubModel;

    #[async_trait]
    impl LanguageModel for StubModel {
        async fn chat(&self, messages: &[ChatMessage], _t: &[ToolSpec]) -> error::Result<ChatOutcome> {
            let system = messages[0].content.clone();
            Ok(ChatOutcome {
                content: Some(format!("explanation using: {system}")),
                tool_calls: vec![],
            })
        }
        async fn stream_chat(
            &self,
            _m: &[ChatMessage],
            _c: tokio_util::sync::CancellationToken,
        ) -> error::Result<TextFragmentStream> {
            unimplemented!()
        }
        async fn embed(&self, _t: &str) -> error::Result<Vec<f32>> {
            Ok(vec![0.0])
        }
        async fn embed_batch(&self, t: &[String]) -> error::Result<Vec<Vec<f32>>> {
            Ok(t.iter().map(|_| vec![0.0]).collect())
        }
    }

    async fn ctx() -> ToolContext {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let model: Arc<dyn LanguageModel> = Arc::new(StubModel);
        let embedding = Arc::new(embedding::EmbeddingService::new(model.clone()));
        let retriever = Arc::new(retriever::HybridRetriever::new(store.clone(), embedding));
        ToolContext {
            store,
            retriever,
            model,
            repository_id: RepositoryId::new(),
        }
    }

    #[tokio::test]
    async fn brief_detail_level_picks_the_brief_prompt() {
        let ctx = ctx().await;
        let tool = ExplainCodeTool;
        let out = tool
            .execute(json!({"code": "fn a() {}", "detail_level": "brief"}), &ctx)
            .await
            .into_string();
        assert!(out.contains("one or two sentences"));
    }

    #[tokio::test]
    async fn missing_code_is_an_error_string() {
        let ctx = ctx().await;
        let tool = ExplainCodeTool;
        let out = tool.execute(json!({}), &ctx).await.into_string();
        assert!(out.starts_with("Error:"));
    }
}
