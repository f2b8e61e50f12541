//! Embedding service (C4, §4.4).
//!
//! Prepares chunk text for embedding by prefixing structured context
//! ahead of the raw code, truncates to a fixed maximum length, and
//! batch-embeds through the C1 adapter, preserving input order.

use std::sync::Arc;

use tracing::debug;

use core::CodeChunk;
use error::Result;
use llm::LanguageModel;

/// Maximum length (in chars) of the text handed to the provider for
/// embedding, after the structured prefix is assembled (§4.4).
pub const MAX_EMBED_TEXT_CHARS: usize = 4000;

/// Builds the structured context prefix ahead of a chunk's raw content
/// (§4.4): `File: <path>`, symbol type/name if present, language,
/// optional namespace/parent class, then `Code:\n<content>`.
pub fn build_embedding_text(chunk: &CodeChunk) -> String {
    let mut s = String::new();
    s.push_str(&format!("File: {}\n", chunk.file_path));

    if let Some(symbol) = &chunk.symbol_name {
        s.push_str(&format!("{}: {}\n", chunk.chunk_type.as_str(), symbol));
    }
    s.push_str(&format!("Language: {}\n", chunk.language));

    if let Some(namespace) = &chunk.metadata.namespace {
        s.push_str(&format!("Namespace: {}\n", namespace));
    }
    if let Some(parent) = &chunk.metadata.parent_class {
        s.push_str(&format!("Parent class: {}\n", parent));
    }

    s.push_str("Code:\n");
    s.push_str(&chunk.content);

    if s.len() > MAX_EMBED_TEXT_CHARS {
        s.truncate(MAX_EMBED_TEXT_CHARS);
    }
    s
}

/// Prepares and embeds a batch of chunks through C1, assigning
/// embeddings back positionally in insertion order (§4.4). Chunks with
/// an already-computed embedding are left untouched; only chunks that
/// need one are sent to the provider.
pub struct EmbeddingService {
    model: Arc<dyn LanguageModel>,
}

impl EmbeddingService {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Embeds a single piece of free text (e.g. a search query).
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.model.embed(text).await
    }

    /// Embeds every chunk in `chunks`, mutating each in place. Order of
    /// the embed-batch request matches input order; results are
    /// assigned back positionally, never reordered (§4.4).
    pub async fn embed_chunks(&self, chunks: &mut [CodeChunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        let texts: Vec<String> = chunks.iter().map(build_embedding_text).collect();
        debug!(n = texts.len(), "embedding chunk batch");
        let vectors = self.model.embed_batch(&texts).await?;

        for (chunk, vector) in chunks.iter_mut().zip(vectors.into_iter()) {
            chunk.embedding = vector;
        }
        Ok(())
    }
}
