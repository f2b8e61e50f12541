//! `find_references` tool (§4.6): scan indexed chunks for definitions,
//! calls, and other usages of a symbol.

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};

use toolkit::{parse_string, parse_string_opt, Tool, ToolContext, ToolOutput};

const MAX_PER_GROUP: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Function,
    Class,
    Variable,
    Any,
}

impl Kind {
    fn parse(s: &str) -> Kind {
        match s.to_ascii_lowercase().as_str() {
            "function" => Kind::Function,
            "class" => Kind::Class,
            "variable" => Kind::Variable,
            _ => Kind::Any,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Definition,
    Call,
    Usage,
}

static CLASS_DEF_RE_TMPL: &str = r"(?i)\b(?:class|struct|interface|enum|trait)\s+{sym}\b";
static FUNCTION_DEF_RE_TMPL: &str = r"(?i)\b(?:function|def|fn|func)\s+{sym}\b|(?:public|private|protected|static|async)\s+[\w<>\[\]]*\s*{sym}\s*\(";
static VARIABLE_DEF_RE_TMPL: &str = r"(?i)\b(?:const|let|var|val)\s+{sym}\b";

static CALL_RE_TMPL: &str = r"{sym}\s*\(";

fn build(template: &str, symbol: &str) -> Regex {
    Regex::new(&template.replace("{sym}", &regex::escape(symbol))).expect("valid regex")
}

fn classify(line: &str, def_re: &[&Regex], call_re: &Regex) -> Category {
    if def_re.iter().any(|re| re.is_match(line)) {
        Category::Definition
    } else if call_re.is_match(line) {
        Category::Call
    } else {
        Category::Usage
    }
}

struct Hit {
    path: String,
    line: usize,
    text: String,
}

fn format_group(title: &str, hits: &[Hit]) -> String {
    if hits.is_empty() {
        return String::new();
    }
    let shown = hits.len().min(MAX_PER_GROUP);
    let overflow = hits.len().saturating_sub(MAX_PER_GROUP);
    let mut out = format!("{title} ({}):\n", hits.len());
    for hit in &hits[..shown] {
        out.push_str(&format!("[{}:{}] {}\n", hit.path, hit.line, hit.text.trim()));
    }
    if overflow > 0 {
        out.push_str(&format!("(+{overflow} more)\n"));
    }
    out.push('\n');
    out
}

pub struct FindReferencesTool;

#[async_trait]
impl Tool for FindReferencesTool {
    fn name(&self) -> &str {
        "find_references"
    }

    fn description(&self) -> &str {
        "Find definitions, calls, and other usages of a symbol across the indexed repository."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "required": ["symbol"],
            "properties": {
                "symbol": {"type": "string", "description": "Symbol name to search for"},
                "kind": {"type": "string", "description": "function|class|variable|any", "default": "any"}
            }
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolOutput {
        let symbol = match parse_string(&args, "symbol") {
            Ok(s) => s,
            Err(e) => return ToolOutput::error(e),
        };
        let kind = Kind::parse(&parse_string_opt(&args, "kind").unwrap_or_else(|| "any".to_string()));

        let chunks = match ctx.store.query_chunks_by_repository(&ctx.repository_id).await {
            Ok(c) => c,
            Err(e) => return ToolOutput::error(e),
        };

        let word_re = build(r"\b{sym}\b", &symbol);
        let call_re = build(CALL_RE_TMPL, &symbol);
        let mut def_patterns = Vec::new();
        let class_re = build(CLASS_DEF_RE_TMPL, &symbol);
        let function_re = build(FUNCTION_DEF_RE_TMPL, &symbol);
        let variable_re = build(VARIABLE_DEF_RE_TMPL, &symbol);
        match kind {
            Kind::Class => def_patterns.push(&class_re),
            Kind::Function => def_patterns.push(&function_re),
            Kind::Variable => def_patterns.push(&variable_re),
            Kind::Any => {
                def_patterns.push(&class_re);
                def_patterns.push(&function_re);
                def_patterns.push(&variable_re);
            }
        }

        let mut definitions = Vec::new();
        let mut calls = Vec::new();
        let mut usages = Vec::new();

        for chunk in &chunks {
            for (offset, line) in chunk.content.lines().enumerate() {
                if !word_re.is_match(line) {
                    continue;
                }
                let absolute_line = chunk.start_line + offset;
                let hit = Hit {
                    path: chunk.file_path.clone(),
                    line: absolute_line,
                    text: line.to_string(),
                };
                match classify(line, &def_patterns, &call_re) {
                    Category::Definition => definitions.push(hit),
                    Category::Call => calls.push(hit),
                    Category::Usage => usages.push(hit),
                }
            }
        }

        if definitions.is_empty() && calls.is_empty() && usages.is_empty() {
            return ToolOutput::success(format!("No references to '{symbol}' found."));
        }

        let mut out = String::new();
        out.push_str(&format_group("Definitions", &definitions));
        out.push_str(&format_group("Calls", &calls));
        out.push_str(&format_group("Usages", &usages));
        ToolOutput::success(out.trim_end().to_string())
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
    async fn finds_definition_and_call_with_correct_absolute_lines() {
        let store = Arc::new(MemoryStore::new());
        let repo = RepositoryId::new();
        store
            .upsert_chunk(chunk(
                &repo,
                "src/auth.rs",
                "fn authenticate(user: &str) -> bool {\n    check(user)\n}",
                10,
            ))
            .await
            .unwrap();
        store
            .upsert_chunk(chunk(&repo, "src/main.rs", "authenticate(\"bob\");", 1))
            .await
            .unwrap();
        let ctx = ctx_with(repo, store).await;

        let tool = FindReferencesTool;
        let out = tool
            .execute(json!({"symbol": "authenticate"}), &ctx)
            .await
            .into_string();
        assert!(out.contains("Definitions (1)"));
        assert!(out.contains("[src/auth.rs:10]"));
        assert!(out.contains("Calls (1)"));
        assert!(out.contains("[src/main.rs:1]"));
    }

    #[tokio::test]
    async fn no_matches_returns_a_plain_message_not_an_error() {
        let store = Arc::new(MemoryStore::new());
        let repo = RepositoryId::new();
        let ctx = ctx_with(repo, store).await;

        let tool = FindReferencesTool;
        let out = tool.execute(json!({"symbol": "ghost"}), &ctx).await.into_string();
        assert!(!out.starts_with("Error:"));
        assert!(out.contains("No references"));
    }

    #[tokio::test]
    async fn overflow_beyond_cap_is_reported() {
        let store = Arc::new(MemoryStore::new());
        let repo = RepositoryId::new();
        let mut content = String::new();
        for i in 0..25 {
            content.push_str(&format!("thing(); // call {i}\n"));
        }
        store.upsert_chunk(chunk(&repo, "src/many.rs", &content, 1)).await.unwrap();
        let ctx = ctx_with(repo, store).await;

        let tool = FindReferencesTool;
        let out = tool.execute(json!({"symbol": "thing"}), &ctx).await.into_string();
        assert!(out.contains("Calls (25)"));
        assert!(out.contains("(+5 more)"));
    }
}
