//! Persistence contract (C2, §4.2) and its in-process reference
//! implementation (§E4).
//!
//! The contract is partitioned exactly as §6.3 describes: `chunks` by
//! `repositoryId`, `repositories` by `id`, `conversations` by `id` with
//! a TTL. A networked `sqlx`+`pgvector` implementation is a drop-in
//! behind the same trait; `MemoryStore` is the one exercised here.

mod memory;

pub use memory::MemoryStore;

use common::{ConversationId, RepositoryId};
use core::{CodeChunk, ConversationContext, Repository};
use error::Result;

/// A chunk annotated with its cosine distance to a query vector
/// (ascending = most similar first), per §4.2's `vectorTopK` contract.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: CodeChunk,
    pub distance: f32,
}

#[async_trait::async_trait]
pub trait Store: Send + Sync {
    async fn upsert_chunk(&self, chunk: CodeChunk) -> Result<()>;

    async fn bulk_upsert_chunks(&self, chunks: Vec<CodeChunk>) -> Result<()>;

    /// Enumerate-and-remove; best-effort, tolerant of a partially
    /// concurrent view (§5).
    async fn delete_chunks_by_repository(&self, repository_id: &RepositoryId) -> Result<usize>;

    async fn query_chunks_by_repository(&self, repository_id: &RepositoryId) -> Result<Vec<CodeChunk>>;

    /// Linear-scan cosine top-K within one repository's partition.
    /// `k == 0` returns an empty vector.
    async fn vector_top_k(
        &self,
        repository_id: &RepositoryId,
        query_embedding: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredChunk>>;

    async fn upsert_repository(&self, repository: Repository) -> Result<()>;

    async fn read_repository(&self, id: &RepositoryId) -> Result<Option<Repository>>;

    async fn list_repositories(&self) -> Result<Vec<Repository>>;

    async fn delete_repository(&self, id: &RepositoryId) -> Result<()>;

    /// Bumps `updatedAt` to now on every call, insert or overwrite.
    async fn upsert_conversation(&self, conversation: ConversationContext) -> Result<()>;

    /// Expired (TTL, §6.3) conversations are treated as absent and
    /// lazily evicted on read.
    async fn read_conversation(&self, id: &ConversationId) -> Result<Option<ConversationContext>>;

    async fn delete_conversation(&self, id: &ConversationId) -> Result<()>;
}

/// Cosine similarity of two equal-length vectors; `0.0` if either is
/// zero-length or zero-norm rather than dividing by zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
