//! Ties the directory walk, semantic chunkers, and size fallback together
//! into the document chunker (C3, §4.3).
//!
//! File-level chunking is parallelised (§5): each discovered file is
//! chunked on its own blocking task and the results are joined back in
//! walk order before being handed to the embedding service.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use common::RepositoryId;
use config::ChunkingConfig;
use core::CodeChunk;

use crate::fallback::size_fallback_chunks;
use crate::language::LanguageFamily;
use crate::semantic::{semantic_brace_chunks, semantic_indent_chunks};
use crate::walk::{walk_repository, DiscoveredFile};

/// Summary counters for one ingestion run, logged at the end (§E1).
#[derive(Debug, Clone, Default)]
pub struct IngestSummary {
    pub files_considered: usize,
    pub files_skipped: usize,
    pub chunks_produced: usize,
    pub languages: Vec<String>,
}

fn chunk_one_file(repository_id: &RepositoryId, root: &Path, file: &DiscoveredFile, cfg: &ChunkingConfig) -> Option<Vec<CodeChunk>> {
    let content = match std::fs::read_to_string(&file.path) {
        Ok(c) => c,
        Err(err) => {
            warn!(path = %file.relative_path, error = %err, "skipping unreadable file during ingestion");
            return None;
        }
    };

    let file_name = Path::new(&file.relative_path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| file.relative_path.clone());

    let semantic = match file.language.family {
        LanguageFamily::Brace => semantic_brace_chunks(
            repository_id,
            &file.relative_path,
            &file_name,
            file.language.name,
            &content,
        ),
        LanguageFamily::Indent => semantic_indent_chunks(
            repository_id,
            &file.relative_path,
            &file_name,
            file.language.name,
            &content,
        ),
    };

    let mut chunks = if semantic.is_empty() {
        size_fallback_chunks(
            repository_id,
            &file.relative_path,
            &file_name,
            file.language.name,
            &content,
            cfg,
        )
    } else {
        semantic
    };

    chunks.sort_by_key(|c| c.start_line);
    let _ = root; // retained for symmetry with callers that need the repo root
    Some(chunks)
}

/// Walks `root`, chunks every eligible file, and returns the full chunk
/// list plus a summary. Chunks within a file are ascending by
/// `start_line` (§4.3); files are processed independently so a failure
/// on one never aborts the run (§4.3 partial-failure policy).
pub async fn chunk_repository(
    repository_id: &RepositoryId,
    root: &Path,
    cfg: &ChunkingConfig,
) -> (Vec<CodeChunk>, IngestSummary) {
    let files = walk_repository(root);
    let root = root.to_path_buf();
    let repository_id = repository_id.clone();
    let cfg = cfg.clone();

    let mut handles = Vec::with_capacity(files.len());
    for file in files {
        let repository_id = repository_id.clone();
        let root = root.clone();
        let cfg = cfg.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let result = chunk_one_file(&repository_id, &root, &file, &cfg);
            (file, result)
        }));
    }

    let mut all_chunks = Vec::new();
    let mut summary = IngestSummary::default();
    let mut languages = std::collections::BTreeSet::new();

    for handle in handles {
        summary.files_considered += 1;
        match handle.await {
            Ok((file, Some(chunks))) => {
                languages.insert(file.language.name.to_string());
                all_chunks.extend(chunks);
            }
            Ok((_, None)) => summary.files_skipped += 1,
            Err(err) => {
                warn!(error = %err, "file-chunking task panicked; skipping");
                summary.files_skipped += 1;
            }
        }
    }

    summary.chunks_produced = all_chunks.len();
    summary.languages = languages.into_iter().collect();

    info!(
        chunks = summary.chunks_produced,
        files = summary.files_considered,
        skipped = summary.files_skipped,
        "repository ingestion complete"
    );

    (all_chunks, summary)
}

/// Convenience wrapper for callers that already hold an owned `PathBuf`.
pub async fn chunk_repository_path(
    repository_id: &RepositoryId,
    root: PathBuf,
    cfg: &ChunkingConfig,
) -> (Vec<CodeChunk>, IngestSummary) {
    chunk_repository(repository_id, &root, cfg).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn chunks_a_small_mixed_repository() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("lib.rs"),
            "pub fn greet(name: &str) -> String {\n    format!(\"hi {}\", name)\n}\n",
        )
        .unwrap();
        fs::write(dir.path().join("README.md"), "# ignored, unknown extension\n").unwrap();

        let repo_id = RepositoryId::new();
        let cfg = ChunkingConfig::default();
        let (chunks, summary) = chunk_repository(&repo_id, dir.path(), &cfg).await;

        assert_eq!(summary.files_considered, 1);
        assert_eq!(summary.files_skipped, 0);
        assert!(!chunks.is_empty());
        assert!(chunks.iter().any(|c| c.symbol_name.as_deref() == Some("greet")));
        assert_eq!(summary.languages, vec!["rust".to_string()]);
    }

    #[tokio::test]
    async fn chunks_within_a_file_are_ascending_by_start_line() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("lib.rs"),
            "pub fn a() {}\n\npub fn b() {}\n\npub fn c() {}\n",
        )
        .unwrap();

        let repo_id = RepositoryId::new();
        let cfg = ChunkingConfig::default();
        let (chunks, _) = chunk_repository(&repo_id, dir.path(), &cfg).await;
        let starts: Vec<usize> = chunks.iter().map(|c| c.start_line).collect();
        let mut sorted = starts.clone();
        sorted.sort();
        assert_eq!(starts, sorted);
    }

    #[tokio::test]
    async fn empty_directory_yields_no_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let repo_id = RepositoryId::new();
        let cfg = ChunkingConfig::default();
        let (chunks, summary) = chunk_repository(&repo_id, dir.path(), &cfg).await;
        assert!(chunks.is_empty());
        assert_eq!(summary.files_considered, 0);
    }
}
