//! `read_file` tool (§4.6): reconstruct a file from its indexed chunks
//! and return a line-numbered excerpt.

use async_trait::async_trait;
use serde_json::{json, Value};

use toolkit::{parse_string, parse_usize_opt, Tool, ToolContext, ToolOutput};

pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of an indexed file, optionally within a line range."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "required": ["file_path"],
            "properties": {
                "file_path": {"type": "string", "description": "File path, or a substring of one, to read"},
                "start_line": {"type": "number", "description": "First line to include (1-based)"},
                "end_line": {"type": "number", "description": "Last line to include (1-based)"}
            }
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolOutput {
        let requested = match parse_string(&args, "file_path") {
            Ok(p) => p,
            Err(e) => return ToolOutput::error(e),
        };

        let chunks = match ctx.store.query_chunks_by_repository(&ctx.repository_id).await {
            Ok(c) => c,
            Err(e) => return ToolOutput::error(e),
        };

        let mut paths: Vec<&str> = chunks.iter().map(|c| c.file_path.as_str()).collect();
        paths.sort_unstable();
        paths.dedup();

        let requested_lower = requested.to_ascii_lowercase();
        let resolved = paths
            .iter()
            .find(|p| p.eq_ignore_ascii_case(&requested))
            .copied();

        let resolved = match resolved {
            Some(p) => p,
            None => {
                let candidates: Vec<&str> = paths
                    .iter()
                    .filter(|p| p.to_ascii_lowercase().contains(&requested_lower))
                    .copied()
                    .collect();
                match candidates.len() {
                    0 => return ToolOutput::error(format!("no file matching '{requested}' is indexed")),
                    1 => candidates[0],
                    _ => {
                        let list = candidates.join("\n- ");
                        return ToolOutput::success(format!(
                            "Multiple files match '{requested}':\n- {list}"
                        ));
                    }
                }
            }
        };

        let mut matching: Vec<&core::CodeChunk> =
            chunks.iter().filter(|c| c.file_path == resolved).collect();
        matching.sort_by_key(|c| c.start_line);

        let mut lines: Vec<(usize, &str)> = Vec::new();
        for chunk in &matching {
            for (offset, line) in chunk.content.lines().enumerate() {
                lines.push((chunk.start_line + offset, line));
            }
        }

        if lines.is_empty() {
            return ToolOutput::error(format!("'{resolved}' has no content indexed"));
        }

        let min_line = lines.iter().map(|(n, _)| *n).min().unwrap_or(1);
        let max_line = lines.iter().map(|(n, _)| *n).max().unwrap_or(min_line);
        let start = parse_usize_opt(&args, "start_line").unwrap_or(min_line).clamp(min_line, max_line);
        let end = parse_usize_opt(&args, "end_line").unwrap_or(max_line).clamp(start, max_line);

        let width = max_line.to_string().len();
        let mut out = String::new();
        out.push_str(&format!("{resolved}\n"));
        for (line_no, text) in lines.iter().filter(|(n, _)| *n >= start && *n <= end) {
            out.push_str(&format!("{line_no:>width$} | {text}\n"));
        }
        ToolOutput::success(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use common::{ChunkId, RepositoryId};
    use core::{ChunkMetadata, ChunkType, CodeChunk};
    use store::{MemoryStore, Store};

    fn chunk(repo: &RepositoryId, path: &str, content: &str, start: usize) -> CodeChunk {
        let end = start + content.lines().count() - 1;
        CodeChunk {
            id: ChunkId::new(),
            repository_id: repo.clone(),
            file_path: path.to_string(),
            file_name: path.rsplit('/').next().unwrap_or(path).to_string(),
            language: "rust".to_string(),
            content: content.to_string(),
            start_line: start,
            end_line: end,
            chunk_type: ChunkType::Function,
            symbol_name: None,
            embedding: vec![],
            metadata: ChunkMetadata::default(),
            created_at: chrono::Utc::now(),
        }
    }

    async fn ctx_with(repo: RepositoryId, store: Arc<MemoryStore>) -> ToolContext {
        use llm::LanguageModel;
        struct NullModel;
        #[async_trait::async_trait]
        impl LanguageModel for NullModel {
            async fn chat(&self, _m: &[core::ChatMessage], _t: &[llm::ToolSpec]) -> error::Result<llm::ChatOutcome> {
                unimplemented!()
            }
            async fn stream_chat(
                &self,
                _m: &[core::ChatMessage],
                _c: tokio_util::sync::CancellationToken,
            ) -> error::Result<llm::TextFragmentStream> {
                unimplemented!()
            }
            async fn embed(&self, _t: &str) -> error::Result<Vec<f32>> {
                Ok(vec![0.0])
            }
            async fn embed_batch(&self, t: &[String]) -> error::Result<Vec<Vec<f32>>> {
                Ok(t.iter().map(|_| vec![0.0]).collect())
            }
        }
        let model: Arc<dyn LanguageModel> = Arc::new(NullModel);
        let embedding = Arc::new(embedding::EmbeddingService::new(model.clone()));
        let store_dyn: Arc<dyn Store> = store;
        let retriever = Arc::new(retriever::HybridRetriever::new(store_dyn.clone(), embedding));
        ToolContext {
            store: store_dyn,
            retriever,
            model,
            repository_id: repo,
        }
    }

    #[tokio::test]
    async fn reconstructs_file_from_chunks_with_line_numbers() {
        let store = Arc::new(MemoryStore::new());
        let repo = RepositoryId::new();
        store.upsert_chunk(chunk(&repo, "src/lib.rs", "fn a() {}\nfn b() {}", 1)).await.unwrap();
        let ctx = ctx_with(repo, store).await;

        let tool = ReadFileTool;
        let out = tool.execute(json!({"file_path": "src/lib.rs"}), &ctx).await.into_string();
        assert!(out.contains("1 | fn a() {}"));
        assert!(out.contains("2 | fn b() {}"));
    }

    #[tokio::test]
    async fn substring_match_with_multiple_candidates_lists_them_without_content() {
        let store = Arc::new(MemoryStore::new());
        let repo = RepositoryId::new();
        store.upsert_chunk(chunk(&repo, "src/auth.rs", "fn a() {}", 1)).await.unwrap();
        store.upsert_chunk(chunk(&repo, "src/auth2.rs", "fn b() {}", 1)).await.unwrap();
        let ctx = ctx_with(repo, store).await;

        let tool = ReadFileTool;
        let out = tool.execute(json!({"file_path": "auth"}), &ctx).await.into_string();
        assert!(out.contains("Multiple files match"));
        assert!(!out.contains("fn a()"));
    }

    #[tokio::test]
    async fn window_is_clamped_to_valid_range() {
        let store = Arc::new(MemoryStore::new());
        let repo = RepositoryId::new();
        store.upsert_chunk(chunk(&repo, "src/lib.rs", "a\nb\nc", 1)).await.unwrap();
        let ctx = ctx_with(repo, store).await;

        let tool = ReadFileTool;
        let out = tool
            .execute(json!({"file_path": "src/lib.rs", "start_line": 0, "end_line": 100}), &ctx)
            .await
            .into_string();
        assert!(out.contains("1 | a"));
        assert!(out.contains("3 | c"));
    }

    #[tokio::test]
    async fn unknown_file_is_an_error_string() {
        let store = Arc::new(MemoryStore::new());
        let repo = RepositoryId::new();
        let ctx = ctx_with(repo, store).await;

        let tool = ReadFileTool;
        let out = tool.execute(json!({"file_path": "nope.rs"}), &ctx).await.into_string();
        assert!(out.starts_with("Error:"));
    }
}
