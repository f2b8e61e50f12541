use crate::chat_message::{ChatMessage, ChatRole};
use common::{ConversationId, RepositoryId};
use serde::{Deserialize, Serialize};

/// A conversation's stored history (§3). Grows monotonically by append;
/// callers may truncate the tail *delivered to the model*, but the
/// stored history here must never be truncated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationContext {
    pub id: ConversationId,
    pub repository_id: RepositoryId,
    pub messages: Vec<ChatMessage>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl ConversationContext {
    pub fn new(repository_id: RepositoryId) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: ConversationId::new(),
            repository_id,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a message and bump `updated_at`.
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
        self.updated_at = chrono::Utc::now();
    }

    /// Last `n` user/assistant turns, in order — the tail delivered to
    /// the model per §4.7 (`conversationHistory-tail ≤ 10`). System and
    /// tool messages are excluded; the stored history is untouched.
    pub fn tail(&self, n: usize) -> Vec<ChatMessage> {
        self.messages
            .iter()
            .filter(|m| matches!(m.role, ChatRole::User | ChatRole::Assistant))
            .rev()
            .take(n)
            .cloned()
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_excludes_system_and_tool_messages_and_preserves_order() {
        let mut ctx = ConversationContext::new(RepositoryId::new());
        ctx.push(ChatMessage::system("you are a helpful assistant"));
        for i in 0..15 {
            ctx.push(ChatMessage::user(format!("q{i}")));
            ctx.push(ChatMessage::assistant(format!("a{i}")));
        }
        let tail = ctx.tail(10);
        assert_eq!(tail.len(), 10);
        assert!(tail.iter().all(|m| matches!(m.role, ChatRole::User | ChatRole::Assistant)));
        assert_eq!(tail.last().unwrap().content, "a14");
    }

    #[test]
    fn push_bumps_updated_at_and_preserves_created_at() {
        let mut ctx = ConversationContext::new(RepositoryId::new());
        let created = ctx.created_at;
        std::thread::sleep(std::time::Duration::from_millis(2));
        ctx.push(ChatMessage::user("hi"));
        assert_eq!(ctx.created_at, created);
        assert!(ctx.updated_at >= created);
    }
}
