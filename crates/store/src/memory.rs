use chrono::Duration;
use dashmap::DashMap;
use tracing::debug;

use common::{ChunkId, ConversationId, RepositoryId};
use core::{CodeChunk, ConversationContext, Repository};
use error::Result;

use crate::{cosine_similarity, ScoredChunk, Store};

const CONVERSATION_TTL_DAYS: i64 = 7;

/// In-process reference store (§E4). Partitioned exactly as §6.3: one
/// concurrent map per repository's chunks, plus flat maps for
/// repositories and conversations. Safe for concurrent use across
/// requests (§5); re-indexing is delete-then-insert and not
/// transactional, so concurrent readers may briefly see a missing
/// partition.
#[derive(Debug, Default)]
pub struct MemoryStore {
    chunks: DashMap<RepositoryId, DashMap<ChunkId, CodeChunk>>,
    repositories: DashMap<RepositoryId, Repository>,
    conversations: DashMap<ConversationId, ConversationContext>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_expired(conversation: &ConversationContext) -> bool {
        let age = chrono::Utc::now() - conversation.updated_at;
        age > Duration::days(CONVERSATION_TTL_DAYS)
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn upsert_chunk(&self, chunk: CodeChunk) -> Result<()> {
        let partition = self.chunks.entry(chunk.repository_id.clone()).or_default();
        partition.insert(chunk.id.clone(), chunk);
        Ok(())
    }

    async fn bulk_upsert_chunks(&self, chunks: Vec<CodeChunk>) -> Result<()> {
        for chunk in chunks {
            self.upsert_chunk(chunk).await?;
        }
        Ok(())
    }

    async fn delete_chunks_by_repository(&self, repository_id: &RepositoryId) -> Result<usize> {
        match self.chunks.remove(repository_id) {
            Some((_, partition)) => Ok(partition.len()),
            None => Ok(0),
        }
    }

    async fn query_chunks_by_repository(&self, repository_id: &RepositoryId) -> Result<Vec<CodeChunk>> {
        Ok(self
            .chunks
            .get(repository_id)
            .map(|partition| partition.iter().map(|e| e.value().clone()).collect())
            .unwrap_or_default())
    }

    async fn vector_top_k(
        &self,
        repository_id: &RepositoryId,
        query_embedding: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let Some(partition) = self.chunks.get(repository_id) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<ScoredChunk> = partition
            .iter()
            .map(|entry| {
                let chunk = entry.value().clone();
                let similarity = cosine_similarity(query_embedding, &chunk.embedding);
                ScoredChunk {
                    chunk,
                    distance: 1.0 - similarity,
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.chunk.id.as_str().cmp(b.chunk.id.as_str()))
        });
        scored.truncate(k);
        Ok(scored)
    }

    async fn upsert_repository(&self, repository: Repository) -> Result<()> {
        self.repositories.insert(repository.id.clone(), repository);
        Ok(())
    }

    async fn read_repository(&self, id: &RepositoryId) -> Result<Option<Repository>> {
        Ok(self.repositories.get(id).map(|r| r.value().clone()))
    }

    async fn list_repositories(&self) -> Result<Vec<Repository>> {
        Ok(self.repositories.iter().map(|e| e.value().clone()).collect())
    }

    async fn delete_repository(&self, id: &RepositoryId) -> Result<()> {
        self.repositories.remove(id);
        Ok(())
    }

    async fn upsert_conversation(&self, mut conversation: ConversationContext) -> Result<()> {
        conversation.updated_at = chrono::Utc::now();
        self.conversations.insert(conversation.id.clone(), conversation);
        Ok(())
    }

    async fn read_conversation(&self, id: &ConversationId) -> Result<Option<ConversationContext>> {
        let Some(entry) = self.conversations.get(id) else {
            return Ok(None);
        };
        if Self::is_expired(entry.value()) {
            drop(entry);
            debug!(conversation_id = %id, "evicting expired conversation");
            self.conversations.remove(id);
            return Ok(None);
        }
        Ok(Some(entry.value().clone()))
    }

    async fn delete_conversation(&self, id: &ConversationId) -> Result<()> {
        self.conversations.remove(id);
        Ok(())
    }
}
