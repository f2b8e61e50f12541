use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use common::{ConversationId, Query, RepositoryId};
use core::ChatMessage;
use error::Result;
use llm::LanguageModel;
use retriever::HybridRetriever;
use session::ConversationService;
use store::Store;
use toolkit::{ToolContext, ToolRegistry};

use crate::types::{AgentResponse, AskMode, ReasoningStep, StreamEvent, MAX_ITERATIONS, MAX_STREAM_CITATIONS};

const SYSTEM_PROMPT: &str = "You are a code-aware assistant answering questions about an indexed repository. \
Use the available tools to gather evidence before answering, and cite every claim about specific code with a \
[path:startLine-endLine] reference.";

/// Drives the bounded tool-calling loop (C7, §4.7).
pub struct ReactAgent {
    model: Arc<dyn LanguageModel>,
    store: Arc<dyn Store>,
    retriever: Arc<HybridRetriever>,
    tools: Arc<ToolRegistry>,
    conversations: Arc<ConversationService>,
}

impl ReactAgent {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        store: Arc<dyn Store>,
        retriever: Arc<HybridRetriever>,
        tools: Arc<ToolRegistry>,
        conversations: Arc<ConversationService>,
    ) -> Self {
        Self { model, store, retriever, tools, conversations }
    }

    fn tool_context(&self, repository_id: &RepositoryId) -> ToolContext {
        ToolContext {
            store: self.store.clone(),
            retriever: self.retriever.clone(),
            model: self.model.clone(),
            repository_id: repository_id.clone(),
        }
    }

    fn finalize(
        conversation_id: ConversationId,
        content: String,
        tool_results: &[String],
        reasoning_steps: Vec<ReasoningStep>,
        is_complete: bool,
    ) -> AgentResponse {
        let grounded = citation::ground(&content, tool_results);
        AgentResponse {
            conversation_id,
            content: grounded.content,
            citations: grounded.citations,
            citation_map: grounded.citation_map,
            reasoning_steps,
            is_complete,
        }
    }

    /// Non-streaming tool-using loop: `BuildContext -> LoopIter*N -> Finalize` (§4.7).
    pub async fn ask(
        &self,
        repository_id: &RepositoryId,
        conversation_id: Option<&ConversationId>,
        message: &str,
    ) -> Result<AgentResponse> {
        let mut conversation = self.conversations.load_or_create(conversation_id, repository_id).await?;
        self.conversations.append(&mut conversation, ChatMessage::user(message)).await?;

        let catalogue = self.tools.catalogue();
        let ctx = self.tool_context(repository_id);

        let mut reasoning_steps = Vec::new();
        let mut tool_results: Vec<String> = Vec::new();
        let mut step_number = 0usize;

        // Seeded once from system + the cross-request history tail; tool
        // round-trips are then pushed onto this same working buffer so the
        // model sees every observation within the request (§4.7).
        let mut messages = vec![ChatMessage::system(SYSTEM_PROMPT)];
        messages.extend(self.conversations.history_tail(&conversation));

        for iteration in 0..MAX_ITERATIONS {
            let outcome = self.model.chat(&messages, &catalogue).await?;

            if outcome.is_tool_call() {
                let assistant_message = ChatMessage::assistant_with_tool_calls(outcome.tool_calls.clone());
                messages.push(assistant_message.clone());
                self.conversations.append(&mut conversation, assistant_message).await?;

                for call in &outcome.tool_calls {
                    step_number += 1;
                    let observation = self.tools.execute(&call.function_name, &call.arguments, &ctx).await;
                    tool_results.push(observation.clone());
                    reasoning_steps.push(ReasoningStep {
                        step_number,
                        thought: format!("Calling tool '{}' to gather evidence.", call.function_name),
                        action: call.function_name.clone(),
                        action_input: call.arguments.clone(),
                        observation: observation.clone(),
                    });
                    let tool_message =
                        ChatMessage::tool_result(call.id.clone(), call.function_name.clone(), observation);
                    messages.push(tool_message.clone());
                    self.conversations.append(&mut conversation, tool_message).await?;
                }
                tracing::info!(iteration, tool_calls = outcome.tool_calls.len(), "agent loop iteration");
                continue;
            }

            let content = outcome.content.unwrap_or_default();
            self.conversations.append(&mut conversation, ChatMessage::assistant(content.clone())).await?;
            return Ok(Self::finalize(conversation.id.clone(), content, &tool_results, reasoning_steps, true));
        }

        tracing::warn!(iterations = MAX_ITERATIONS, "agent iteration budget exhausted");
        let apology = "I wasn't able to finish answering this within my reasoning budget. \
            Please rephrase the question or narrow its scope."
            .to_string();
        self.conversations.append(&mut conversation, ChatMessage::assistant(apology.clone())).await?;
        Ok(Self::finalize(conversation.id.clone(), apology, &tool_results, reasoning_steps, false))
    }

    /// Streaming tool-using loop (§4.7, §6.2). Tool events are emitted as
    /// they happen; once the model stops requesting tools (or the budget
    /// is exhausted), the final answer is re-requested via `streamChat`
    /// so it can be delivered fragment by fragment, followed by up to
    /// `MAX_STREAM_CITATIONS` citation events and a closing `done`.
    pub fn ask_stream(
        self: Arc<Self>,
        repository_id: RepositoryId,
        conversation_id: Option<ConversationId>,
        message: String,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<StreamEvent>> {
        async_stream::try_stream! {
            let mut conversation = self
                .conversations
                .load_or_create(conversation_id.as_ref(), &repository_id)
                .await?;
            self.conversations.append(&mut conversation, ChatMessage::user(message)).await?;

            let catalogue = self.tools.catalogue();
            let ctx = self.tool_context(&repository_id);
            let mut tool_results: Vec<String> = Vec::new();
            let mut exhausted = true;

            // Seeded once, then grown in place across tool round-trips so the
            // follow-up `streamChat` call also sees every observation (§4.7).
            let mut messages = vec![ChatMessage::system(SYSTEM_PROMPT)];
            messages.extend(self.conversations.history_tail(&conversation));

            for _ in 0..MAX_ITERATIONS {
                if cancel.is_cancelled() {
                    return;
                }

                let outcome = self.model.chat(&messages, &catalogue).await?;

                if outcome.is_tool_call() {
                    let assistant_message = ChatMessage::assistant_with_tool_calls(outcome.tool_calls.clone());
                    messages.push(assistant_message.clone());
                    self.conversations.append(&mut conversation, assistant_message).await?;

                    for call in &outcome.tool_calls {
                        yield StreamEvent::action(&call.function_name, &call.arguments);
                        let observation = self.tools.execute(&call.function_name, &call.arguments, &ctx).await;
                        yield StreamEvent::observation(&observation);
                        tool_results.push(observation.clone());
                        let tool_message =
                            ChatMessage::tool_result(call.id.clone(), call.function_name.clone(), observation);
                        messages.push(tool_message.clone());
                        self.conversations.append(&mut conversation, tool_message).await?;
                    }
                    continue;
                }

                exhausted = false;
                break;
            }

            if exhausted {
                tracing::warn!(iterations = MAX_ITERATIONS, "agent iteration budget exhausted");
            }

            let mut fragments = self.model.stream_chat(&messages, cancel.clone()).await?;
            let mut content = String::new();
            while let Some(fragment) = fragments.next().await {
                if cancel.is_cancelled() {
                    break;
                }
                let fragment = fragment?;
                content.push_str(&fragment);
                yield StreamEvent::answer(fragment);
            }

            self.conversations.append(&mut conversation, ChatMessage::assistant(content.clone())).await?;

            let grounded = citation::ground(&content, &tool_results);
            for found in grounded.citations.into_iter().take(MAX_STREAM_CITATIONS) {
                yield StreamEvent::citation(found);
            }

            yield StreamEvent::done(conversation.id.clone());
        }
    }

    /// Pure-RAG degradation (§E6): one retrieval, one non-streaming chat
    /// call over the retrieved context, one Finalize. No tool loop.
    pub async fn ask_pure_rag(
        &self,
        repository_id: &RepositoryId,
        conversation_id: Option<&ConversationId>,
        message: &str,
    ) -> Result<AgentResponse> {
        let mut conversation = self.conversations.load_or_create(conversation_id, repository_id).await?;
        self.conversations.append(&mut conversation, ChatMessage::user(message)).await?;

        let hits = self.retriever.hybrid_search(repository_id, &Query::from(message), None, 5).await?;

        let context_blocks: Vec<String> = hits
            .iter()
            .map(|hit| {
                let chunk = &hit.chunk;
                format!(
                    "--- [{}:{}-{}] ({}: {}) [Score: {:.2}] ---\n```{}\n{}\n```",
                    chunk.file_path,
                    chunk.start_line,
                    chunk.end_line,
                    chunk.chunk_type.as_str(),
                    chunk.symbol_name.clone().unwrap_or_default(),
                    hit.score,
                    chunk.language,
                    chunk.content,
                )
            })
            .collect();

        let system_prompt = if context_blocks.is_empty() {
            format!("{SYSTEM_PROMPT}\n\nNo relevant code was retrieved for this question.")
        } else {
            format!("{SYSTEM_PROMPT}\n\nRelevant code:\n{}", context_blocks.join("\n\n"))
        };

        let messages = vec![ChatMessage::system(system_prompt), ChatMessage::user(message)];
        let outcome = self.model.chat(&messages, &[]).await?;
        let content = outcome.content.unwrap_or_default();
        self.conversations.append(&mut conversation, ChatMessage::assistant(content.clone())).await?;

        Ok(Self::finalize(conversation.id.clone(), content, &context_blocks, Vec::new(), true))
    }

    /// Non-streaming entrypoint that selects between the canonical
    /// tool-using loop and the pure-RAG degradation per request (§9 Open
    /// Question), both returning the same `AgentResponse` shape.
    pub async fn ask_with_mode(
        &self,
        repository_id: &RepositoryId,
        conversation_id: Option<&ConversationId>,
        message: &str,
        mode: AskMode,
    ) -> Result<AgentResponse> {
        match mode {
            AskMode::React => self.ask(repository_id, conversation_id, message).await,
            AskMode::Rag => self.ask_pure_rag(repository_id, conversation_id, message).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use core::{ChatRole, ChunkMetadata, ChunkType, ToolCall};
    use embedding::EmbeddingService;
    use llm::{ChatOutcome, TextFragmentStream, ToolSpec};
    use store::MemoryStore;

    struct ScriptedModel {
        responses: Mutex<VecDeque<ChatOutcome>>,
        seen_messages: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedModel {
        fn new(responses: Vec<ChatOutcome>) -> Self {
            Self { responses: Mutex::new(responses.into()), seen_messages: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn chat(&self, messages: &[ChatMessage], _tools: &[ToolSpec]) -> Result<ChatOutcome> {
            self.seen_messages.lock().unwrap().push(messages.to_vec());
            let mut queue = self.responses.lock().unwrap();
            Ok(queue.pop_front().unwrap_or(ChatOutcome { content: Some(String::new()), tool_calls: Vec::new() }))
        }

        async fn stream_chat(&self, _messages: &[ChatMessage], _cancel: CancellationToken) -> Result<TextFragmentStream> {
            unimplemented!("not exercised by the non-streaming tests")
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    async fn seeded_store(repo: &RepositoryId) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store
            .upsert_chunk(core::CodeChunk {
                id: common::ChunkId::new(),
                repository_id: repo.clone(),
                file_path: "src/auth.rs".to_string(),
                file_name: "auth.rs".to_string(),
                language: "rust".to_string(),
                content: "fn authenticate(user: &str) -> bool { true }".to_string(),
                start_line: 1,
                end_line: 1,
                chunk_type: ChunkType::Function,
                symbol_name: Some("authenticate".to_string()),
                embedding: vec![1.0, 0.0],
                metadata: ChunkMetadata::default(),
                created_at: chrono::Utc::now(),
            })
            .await
            .unwrap();
        store
    }

    fn agent_with(model: Arc<dyn LanguageModel>, store: Arc<dyn Store>) -> ReactAgent {
        let embedding = Arc::new(EmbeddingService::new(model.clone()));
        let retriever = Arc::new(HybridRetriever::new(store.clone(), embedding));
        let tools = Arc::new(tools::default_registry());
        let conversations = Arc::new(ConversationService::new(store.clone()));
        ReactAgent::new(model, store, retriever, tools, conversations)
    }

    #[tokio::test]
    async fn ask_executes_a_tool_call_then_finalizes_with_citations() {
        let repo = RepositoryId::new();
        let store: Arc<dyn Store> = seeded_store(&repo).await;

        let model: Arc<dyn LanguageModel> = Arc::new(ScriptedModel::new(vec![
            ChatOutcome {
                content: None,
                tool_calls: vec![ToolCall {
                    id: "1".into(),
                    function_name: "code_search".into(),
                    arguments: r#"{"query":"authenticate"}"#.into(),
                }],
            },
            ChatOutcome {
                content: Some("authenticate is defined at [src/auth.rs:1-1].".into()),
                tool_calls: Vec::new(),
            },
        ]));

        let agent = agent_with(model, store);
        let response = agent.ask(&repo, None, "how does auth work?").await.unwrap();

        assert!(response.is_complete);
        assert_eq!(response.reasoning_steps.len(), 1);
        assert_eq!(response.reasoning_steps[0].action, "code_search");
        assert_eq!(response.citations.len(), 1);
        assert!(response.content.contains("[1]"));
    }

    #[tokio::test]
    async fn ask_carries_tool_results_into_the_next_model_call() {
        let repo = RepositoryId::new();
        let store: Arc<dyn Store> = seeded_store(&repo).await;

        let model = Arc::new(ScriptedModel::new(vec![
            ChatOutcome {
                content: None,
                tool_calls: vec![ToolCall {
                    id: "1".into(),
                    function_name: "code_search".into(),
                    arguments: r#"{"query":"authenticate"}"#.into(),
                }],
            },
            ChatOutcome {
                content: Some("authenticate is defined at [src/auth.rs:1-1].".into()),
                tool_calls: Vec::new(),
            },
        ]));

        let agent = agent_with(model.clone(), store);
        agent.ask(&repo, None, "how does auth work?").await.unwrap();

        let seen = model.seen_messages.lock().unwrap();
        assert_eq!(seen.len(), 2);
        let second_call = &seen[1];
        assert!(second_call.iter().any(|m| m.role == ChatRole::Assistant && m.tool_calls.is_some()));
        assert!(second_call.iter().any(|m| m.role == ChatRole::Tool));
    }

    #[tokio::test]
    async fn ask_finalizes_incomplete_when_iterations_are_exhausted() {
        let repo = RepositoryId::new();
        let store: Arc<dyn Store> = seeded_store(&repo).await;

        let looping_call = ChatOutcome {
            content: None,
            tool_calls: vec![ToolCall {
                id: "1".into(),
                function_name: "code_search".into(),
                arguments: r#"{"query":"authenticate"}"#.into(),
            }],
        };
        let model: Arc<dyn LanguageModel> =
            Arc::new(ScriptedModel::new(std::iter::repeat(looping_call).take(MAX_ITERATIONS).collect()));

        let agent = agent_with(model, store);
        let response = agent.ask(&repo, None, "loop forever").await.unwrap();

        assert!(!response.is_complete);
        assert_eq!(response.reasoning_steps.len(), MAX_ITERATIONS);
    }

    #[tokio::test]
    async fn ask_pure_rag_skips_the_tool_loop_and_still_grounds_citations() {
        let repo = RepositoryId::new();
        let store: Arc<dyn Store> = seeded_store(&repo).await;

        let model: Arc<dyn LanguageModel> = Arc::new(ScriptedModel::new(vec![ChatOutcome {
            content: Some("See [src/auth.rs:1-1] for the check.".into()),
            tool_calls: Vec::new(),
        }]));

        let agent = agent_with(model, store);
        let response = agent.ask_pure_rag(&repo, None, "authenticate").await.unwrap();

        assert!(response.is_complete);
        assert!(response.reasoning_steps.is_empty());
        assert_eq!(response.citations.len(), 1);
    }
}
