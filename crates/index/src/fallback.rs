//! Size-based fallback chunking (§4.3).
//!
//! Used when a file has no semantic matches, or its language isn't one
//! of the brace/indent families at all but is still in the extension
//! table. Chunks grow line-by-line until the accumulated character
//! length reaches `max_chunk_size`; consecutive chunks overlap by
//! `overlap_size / 50` lines to keep local context across the boundary.

use common::{ChunkId, RepositoryId};
use config::ChunkingConfig;
use core::{ChunkMetadata, ChunkType, CodeChunk};

/// Number of lines carried over from the end of one chunk into the
/// start of the next (§4.3: `OverlapSize/50`).
fn overlap_lines(cfg: &ChunkingConfig) -> usize {
    cfg.overlap_size / 50
}

/// Splits `content` into fixed-size, line-overlapping chunks (§4.3).
/// Always returns at least one chunk for non-empty content.
pub fn size_fallback_chunks(
    repository_id: &RepositoryId,
    relative_path: &str,
    file_name: &str,
    language_name: &str,
    content: &str,
    cfg: &ChunkingConfig,
) -> Vec<CodeChunk> {
    let lines: Vec<&str> = content.lines().collect();
    if lines.is_empty() {
        return Vec::new();
    }

    let overlap = overlap_lines(cfg);
    let mut chunks = Vec::new();
    let mut start_idx = 0usize;

    while start_idx < lines.len() {
        let mut end_idx = start_idx;
        let mut size = 0usize;
        while end_idx < lines.len() {
            size += lines[end_idx].len() + 1;
            if size >= cfg.max_chunk_size && end_idx > start_idx {
                break;
            }
            end_idx += 1;
        }
        let end_idx = end_idx.min(lines.len() - 1).max(start_idx);

        let span = &lines[start_idx..=end_idx];
        chunks.push(CodeChunk {
            id: ChunkId::new(),
            repository_id: repository_id.clone(),
            file_path: relative_path.to_string(),
            file_name: file_name.to_string(),
            language: language_name.to_string(),
            content: span.join("\n"),
            start_line: start_idx + 1,
            end_line: end_idx + 1,
            chunk_type: ChunkType::Code,
            symbol_name: None,
            embedding: Vec::new(),
            metadata: ChunkMetadata::default(),
            created_at: chrono::Utc::now(),
        });

        if end_idx + 1 >= lines.len() {
            break;
        }
        let next_start = end_idx + 1;
        start_idx = next_start.saturating_sub(overlap).max(start_idx + 1);
    }

    chunks
}
