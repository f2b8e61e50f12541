//! Conversation session management, layered over C2's `conversations`
//! partition (§3, §4.2, §6.3).
//!
//! The store owns persistence; this crate is the domain-level API the
//! orchestrator (C7) uses to load, grow, and truncate a conversation
//! without reaching into `Store` directly.

use std::sync::Arc;

use common::{ConversationId, RepositoryId};
use core::{ChatMessage, ConversationContext};
use error::Result;
use store::Store;

/// Conversation history handed to the model is capped to the last N
/// turns (user/assistant only), per §4.7.
pub const HISTORY_TAIL_LEN: usize = 10;

pub struct ConversationService {
    store: Arc<dyn Store>,
}

impl ConversationService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Loads an existing conversation by id, or starts a fresh one
    /// scoped to `repository_id` when `conversation_id` is absent or
    /// has expired/never existed.
    pub async fn load_or_create(
        &self,
        conversation_id: Option<&ConversationId>,
        repository_id: &RepositoryId,
    ) -> Result<ConversationContext> {
        if let Some(id) = conversation_id {
            if let Some(existing) = self.store.read_conversation(id).await? {
                return Ok(existing);
            }
        }
        Ok(ConversationContext::new(repository_id.clone()))
    }

    pub async fn get(&self, id: &ConversationId) -> Result<Option<ConversationContext>> {
        self.store.read_conversation(id).await
    }

    /// Appends a message and persists the whole conversation (§3:
    /// `ConversationContext` grows monotonically by append, and the
    /// full history is always the one written to the store; only the
    /// tail delivered to the model may be truncated).
    pub async fn append(&self, conversation: &mut ConversationContext, message: ChatMessage) -> Result<()> {
        conversation.push(message);
        self.store.upsert_conversation(conversation.clone()).await
    }

    /// The last `HISTORY_TAIL_LEN` user/assistant turns, in order,
    /// suitable for inclusion in a model prompt (§4.7).
    pub fn history_tail(&self, conversation: &ConversationContext) -> Vec<ChatMessage> {
        conversation.tail(HISTORY_TAIL_LEN)
    }

    pub async fn delete(&self, id: &ConversationId) -> Result<()> {
        self.store.delete_conversation(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::MemoryStore;

    fn service() -> ConversationService {
        ConversationService::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn load_or_create_starts_a_fresh_conversation_when_id_is_absent() {
        let svc = service();
        let repo = RepositoryId::new();
        let conv = svc.load_or_create(None, &repo).await.unwrap();
        assert_eq!(conv.repository_id, repo);
        assert!(conv.messages.is_empty());
    }

    #[tokio::test]
    async fn append_persists_so_a_later_load_sees_the_message() {
        let svc = service();
        let repo = RepositoryId::new();
        let mut conv = svc.load_or_create(None, &repo).await.unwrap();
        let id = conv.id.clone();
        svc.append(&mut conv, ChatMessage::user("hello")).await.unwrap();

        let reloaded = svc.get(&id).await.unwrap().unwrap();
        assert_eq!(reloaded.messages.len(), 1);
        assert_eq!(reloaded.messages[0].content, "hello");
    }

    #[tokio::test]
    async fn load_or_create_falls_back_to_fresh_when_id_is_unknown() {
        let svc = service();
        let repo = RepositoryId::new();
        let unknown = ConversationId::new();
        let conv = svc.load_or_create(Some(&unknown), &repo).await.unwrap();
        assert_ne!(conv.id, unknown);
    }

    #[tokio::test]
    async fn history_tail_delegates_to_conversation_context_truncation() {
        let svc = service();
        let repo = RepositoryId::new();
        let mut conv = svc.load_or_create(None, &repo).await.unwrap();
        for i in 0..15 {
            svc.append(&mut conv, ChatMessage::user(format!("turn {i}"))).await.unwrap();
        }
        let tail = svc.history_tail(&conv);
        assert_eq!(tail.len(), HISTORY_TAIL_LEN);
        assert_eq!(tail.last().unwrap().content, "turn 14");
    }
}
