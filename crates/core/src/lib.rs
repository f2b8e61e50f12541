//! Shared data model for codeqa (§3).
//!
//! The store (`store` crate) owns these entities exclusively; every
//! other component holds them by value for the duration of a request.

pub mod chat_message;
pub mod chunk;
pub mod citation;
pub mod conversation;
pub mod repository;

pub use chat_message::{ChatMessage, ChatRole, ToolCall};
pub use chunk::{ChunkMetadata, ChunkType, CodeChunk};
pub use citation::{Citation, SourceType};
pub use conversation::ConversationContext;
pub use repository::Repository;
