//! Hybrid retriever (C5, §4.5).
//!
//! Combines a vector-similarity search against C2 with a keyword scan
//! over the same repository's chunks, merges the two score spaces, and
//! applies an optional conjunctive filter before truncating to `topK`.

use std::collections::HashMap;
use std::sync::Arc;

use common::{ChunkId, Query, RepositoryId};
use core::{ChunkType, CodeChunk};
use embedding::EmbeddingService;
use error::Result;
use store::Store;

/// Weight applied to the vector score when merging with the keyword
/// score in `hybrid_search` (§4.5 step 3).
const VECTOR_WEIGHT: f32 = 0.7;
/// Weight applied to the keyword score in the same merge.
const KEYWORD_WEIGHT: f32 = 0.3;

/// A chunk annotated with its retrieval score, descending-sorted by the
/// caller.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub chunk: CodeChunk,
    pub score: f32,
}

/// Optional, conjunctive, case-insensitive filter over `hybridSearch`
/// results (§4.5 step 4). `path_substrings` matches if the chunk's file
/// path contains *any* of the listed substrings; every other present
/// field must also match.
#[derive(Debug, Clone, Default)]
pub struct RetrievalFilter {
    pub language: Option<String>,
    pub chunk_type: Option<ChunkType>,
    pub file_name_contains: Option<String>,
    pub path_substrings: Vec<String>,
}

impl RetrievalFilter {
    fn matches(&self, chunk: &CodeChunk) -> bool {
        if let Some(language) = &self.language {
            if !chunk.language.eq_ignore_ascii_case(language) {
                return false;
            }
        }
        if let Some(chunk_type) = &self.chunk_type {
            if chunk.chunk_type != *chunk_type {
                return false;
            }
        }
        if let Some(name) = &self.file_name_contains {
            if !chunk
                .file_name
                .to_ascii_lowercase()
                .contains(&name.to_ascii_lowercase())
            {
                return false;
            }
        }
        if !self.path_substrings.is_empty() {
            let path_lower = chunk.file_path.to_ascii_lowercase();
            let any_match = self
                .path_substrings
                .iter()
                .any(|s| path_lower.contains(&s.to_ascii_lowercase()));
            if !any_match {
                return false;
            }
        }
        true
    }
}

pub struct HybridRetriever {
    store: Arc<dyn Store>,
    embedding: Arc<EmbeddingService>,
}

impl HybridRetriever {
    pub fn new(store: Arc<dyn Store>, embedding: Arc<EmbeddingService>) -> Self {
        Self { store, embedding }
    }

    /// Baseline vector-only search (§4.5): embed, `vectorTopK` with
    /// `K = topK`, score by cosine similarity clamped into `[0, 1]`.
    pub async fn search(
        &self,
        repository_id: &RepositoryId,
        query: &Query,
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        if query.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        let query_embedding = self.embedding.embed_query(query.as_str()).await?;
        let hits = self.store.vector_top_k(repository_id, &query_embedding, top_k).await?;
        Ok(hits
            .into_iter()
            .map(|scored| RetrievedChunk {
                chunk: scored.chunk,
                score: (1.0 - scored.distance).clamp(0.0, 1.0),
            })
            .collect())
    }

    /// Combined vector + keyword search with optional filtering (§4.5).
    pub async fn hybrid_search(
        &self,
        repository_id: &RepositoryId,
        query: &Query,
        filter: Option<&RetrievalFilter>,
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        if query.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        // Step 1: vector search at 2*topK.
        let query_embedding = self.embedding.embed_query(query.as_str()).await?;
        let vector_hits = self
            .store
            .vector_top_k(repository_id, &query_embedding, top_k * 2)
            .await?;

        let mut vector_order: HashMap<ChunkId, usize> = HashMap::new();
        let mut merged: HashMap<ChunkId, (CodeChunk, f32)> = HashMap::new();
        for (idx, scored) in vector_hits.into_iter().enumerate() {
            let similarity = (1.0 - scored.distance).clamp(0.0, 1.0);
            vector_order.insert(scored.chunk.id.clone(), idx);
            merged.insert(scored.chunk.id.clone(), (scored.chunk, similarity * VECTOR_WEIGHT));
        }

        // Step 2: keyword search over the whole repository partition.
        let tokens: Vec<String> = query
            .as_str()
            .split_whitespace()
            .map(|t| t.to_ascii_lowercase())
            .filter(|t| !t.is_empty())
            .collect();

        if !tokens.is_empty() {
            let all_chunks = self.store.query_chunks_by_repository(repository_id).await?;
            let mut keyword_scored: Vec<(CodeChunk, f32)> = Vec::new();
            for chunk in all_chunks {
                let haystack = format!(
                    "{} {}",
                    chunk.content.to_ascii_lowercase(),
                    chunk.symbol_name.clone().unwrap_or_default().to_ascii_lowercase()
                );
                let matches = tokens.iter().filter(|t| haystack.contains(t.as_str())).count();
                if matches == 0 {
                    continue;
                }
                let score = matches as f32 / tokens.len() as f32;
                keyword_scored.push((chunk, score));
            }
            keyword_scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
            keyword_scored.truncate(top_k);

            // Step 3: merge by chunk id, weighted and summed on overlap.
            for (chunk, score) in keyword_scored {
                merged
                    .entry(chunk.id.clone())
                    .and_modify(|(_, total)| *total += score * KEYWORD_WEIGHT)
                    .or_insert_with(|| (chunk, score * KEYWORD_WEIGHT));
            }
        }

        // Step 4: apply the optional filter.
        let mut results: Vec<RetrievedChunk> = merged
            .into_values()
            .filter(|(chunk, _)| filter.map(|f| f.matches(chunk)).unwrap_or(true))
            .map(|(chunk, score)| RetrievedChunk {
                chunk,
                score: score.min(1.0),
            })
            .collect();

        // Step 5: sort descending by score; tie-break by original vector
        // order, then by chunk id, for determinism.
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    let a_order = vector_order.get(&a.chunk.id).copied().unwrap_or(usize::MAX);
                    let b_order = vector_order.get(&b.chunk.id).copied().unwrap_or(usize::MAX);
                    a_order.cmp(&b_order)
                })
                .then_with(|| a.chunk.id.as_str().cmp(b.chunk.id.as_str()))
        });
        results.truncate(top_k);
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use core::{ChatMessage, ChunkMetadata};
    use llm::{ChatOutcome, LanguageModel, TextFragmentStream, ToolSpec};
    use store::MemoryStore;

    struct FakeModel;

    #[async_trait]
    impl LanguageModel for FakeModel {
        async fn chat(&self, _messages: &[ChatMessage], _tools: &[ToolSpec]) -> Result<ChatOutcome> {
            unimplemented!()
        }
        async fn stream_chat(
            &self,
            _messages: &[ChatMessage],
            _cancel: tokio_util::sync::CancellationToken,
        ) -> Result<TextFragmentStream> {
            unimplemented!()
        }
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    fn make_chunk(repo: &RepositoryId, path: &str, content: &str, symbol: &str, embedding: Vec<f32>) -> CodeChunk {
        CodeChunk {
            id: common::ChunkId::new(),
            repository_id: repo.clone(),
            file_path: path.to_string(),
            file_name: path.rsplit('/').next().unwrap_or(path).to_string(),
            language: "rust".to_string(),
            content: content.to_string(),
            start_line: 1,
            end_line: 1,
            chunk_type: ChunkType::Function,
            symbol_name: Some(symbol.to_string()),
            embedding,
            metadata: ChunkMetadata::default(),
            created_at: chrono::Utc::now(),
        }
    }

    async fn setup() -> (Arc<MemoryStore>, HybridRetriever, RepositoryId) {
        let store = Arc::new(MemoryStore::new());
        let repo = RepositoryId::new();
        store
            .upsert_chunk(make_chunk(&repo, "src/auth.rs", "fn authenticate(user: &str) -> bool { true }", "authenticate", vec![1.0, 0.0]))
            .await
            .unwrap();
        store
            .upsert_chunk(make_chunk(&repo, "src/math.rs", "fn add(a: i32, b: i32) -> i32 { a + b }", "add", vec![0.0, 1.0]))
            .await
            .unwrap();

        let embedding = Arc::new(EmbeddingService::new(Arc::new(FakeModel)));
        let retriever = HybridRetriever::new(store.clone(), embedding);
        (store, retriever, repo)
    }

    #[tokio::test]
    async fn empty_query_returns_empty_without_error() {
        let (_store, retriever, repo) = setup().await;
        let results = retriever.hybrid_search(&repo, &Query::from(""), None, 5).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn keyword_match_surfaces_the_matching_chunk_with_bounded_score() {
        let (_store, retriever, repo) = setup().await;
        let results = retriever
            .hybrid_search(&repo, &Query::from("authenticate"), None, 5)
            .await
            .unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].chunk.file_path, "src/auth.rs");
        assert!(results[0].score > 0.0 && results[0].score <= 1.0);
    }

    #[tokio::test]
    async fn filter_by_language_excludes_non_matching_chunks() {
        let (store, retriever, repo) = setup().await;
        store
            .upsert_chunk(make_chunk(&repo, "src/auth.py", "def authenticate(): return True", "authenticate", vec![1.0, 0.0]))
            .await
            .unwrap();

        let filter = RetrievalFilter {
            language: Some("python".to_string()),
            ..Default::default()
        };
        let results = retriever
            .hybrid_search(&repo, &Query::from("authenticate"), Some(&filter), 5)
            .await
            .unwrap();
        assert!(results.iter().all(|r| r.chunk.language == "python"));
    }

    #[tokio::test]
    async fn search_scores_are_bounded_by_one() {
        let (_store, retriever, repo) = setup().await;
        let results = retriever.search(&repo, &Query::from("authenticate"), 2).await.unwrap();
        assert!(results.iter().all(|r| r.score <= 1.0));
    }
}
