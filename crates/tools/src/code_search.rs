//! `code_search` tool (§4.6): hybrid-search the repository and format
//! hits so the citation service can re-extract them.

use async_trait::async_trait;
use serde_json::{json, Value};

use common::Query;
use core::ChunkType;
use retriever::RetrievalFilter;
use toolkit::{parse_string, parse_string_opt, Tool, ToolContext, ToolOutput};

const MAX_HITS: usize = 5;

fn parse_chunk_type(s: &str) -> Option<ChunkType> {
    match s.to_ascii_lowercase().as_str() {
        "code" => Some(ChunkType::Code),
        "class" => Some(ChunkType::Class),
        "method" => Some(ChunkType::Method),
        "function" => Some(ChunkType::Function),
        "comment" => Some(ChunkType::Comment),
        _ => None,
    }
}

pub struct CodeSearchTool;

#[async_trait]
impl Tool for CodeSearchTool {
    fn name(&self) -> &str {
        "code_search"
    }

    fn description(&self) -> &str {
        "Search the indexed repository for code relevant to a query, combining vector and keyword signals."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "required": ["query"],
            "properties": {
                "query": {"type": "string", "description": "Natural-language or keyword search query"},
                "language": {"type": "string", "description": "Restrict results to this language"},
                "chunk_type": {"type": "string", "description": "Restrict results to this chunk type (code|class|method|function|comment)"}
            }
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolOutput {
        let query = match parse_string(&args, "query") {
            Ok(q) => q,
            Err(e) => return ToolOutput::error(e),
        };

        let mut filter = RetrievalFilter::default();
        filter.language = parse_string_opt(&args, "language");
        if let Some(kind) = parse_string_opt(&args, "chunk_type") {
            filter.chunk_type = parse_chunk_type(&kind);
        }
        let filter_ref = if filter.language.is_some() || filter.chunk_type.is_some() {
            Some(&filter)
        } else {
            None
        };

        let hits = match ctx
            .retriever
            .hybrid_search(&ctx.repository_id, &Query::from(query), filter_ref, MAX_HITS)
            .await
        {
            Ok(hits) => hits,
            Err(e) => return ToolOutput::error(e),
        };

        if hits.is_empty() {
            return ToolOutput::success("No matching code found.");
        }

        let mut out = String::new();
        for hit in hits {
            let chunk = &hit.chunk;
            let symbol = chunk.symbol_name.clone().unwrap_or_default();
            out.push_str(&format!(
                "--- [{}:{}-{}] ({}: {}) [Score: {:.2}] ---\n```{}\n{}\n```\n",
                chunk.file_path,
                chunk.start_line,
                chunk.end_line,
                chunk.chunk_type.as_str(),
                symbol,
                hit.score,
                chunk.language,
                chunk.content,
            ));
        }
        ToolOutput::success(out)
    }
}
