//! Toolkit: tool abstraction layer for the agent orchestrator (§4.6).
//!
//! Every tool exposes `{ name, description, jsonSchema, execute(args,
//! repoId) -> resultString }`. Results are plain strings, formatted so
//! the citation service (C8) can re-extract `[path:line-line]` markers
//! from them; a tool never throws across this boundary — failures come
//! back as a string beginning with `Error:`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use common::RepositoryId;
use error::{CodeqaError, Result};
use llm::{LanguageModel, ToolSpec};
use retriever::HybridRetriever;
use store::Store;

/// Shared dependencies a tool needs to execute, scoped to one request.
pub struct ToolContext {
    pub store: Arc<dyn Store>,
    pub retriever: Arc<HybridRetriever>,
    pub model: Arc<dyn LanguageModel>,
    pub repository_id: RepositoryId,
}

/// The string result of a tool execution. Never a thrown error: a
/// failure is represented as a string beginning with `Error:` (§4.6).
#[derive(Debug, Clone)]
pub struct ToolOutput(String);

impl ToolOutput {
    pub fn success(result: impl Into<String>) -> Self {
        Self(result.into())
    }

    pub fn error(message: impl std::fmt::Display) -> Self {
        Self(format!("Error: {message}"))
    }

    pub fn is_error(&self) -> bool {
        self.0.starts_with("Error:")
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for ToolOutput {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Abstract interface for an agent tool (§4.6).
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters(&self) -> Value;

    /// Execute with already-parsed arguments. Implementations should
    /// prefer `ToolOutput::error` over panicking or returning an `Err`
    /// for anything short of a broken dependency (§7: `ToolError`
    /// never surfaces to the caller, it feeds back to the model).
    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolOutput;

    fn schema(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Registry of available tools, keyed by name.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: HashMap::new() }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn register_all(&mut self, tools: Vec<Arc<dyn Tool>>) {
        for tool in tools {
            self.register(tool);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// The tool catalogue handed to `C1.chat` (§4.1).
    pub fn catalogue(&self) -> Vec<ToolSpec> {
        self.tools.values().map(|t| t.schema()).collect()
    }

    /// Parse `args_json` and execute the named tool, never throwing:
    /// an unknown tool or malformed JSON comes back as an `Error:`
    /// string (§4.6).
    pub async fn execute(&self, name: &str, args_json: &str, ctx: &ToolContext) -> String {
        let Some(tool) = self.get(name) else {
            return format!("Error: unknown tool '{name}'");
        };
        let args: Value = match serde_json::from_str(args_json) {
            Ok(v) => v,
            Err(e) => return format!("Error: malformed arguments: {e}"),
        };
        tool.execute(args, ctx).await.into_string()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper to pull a required string field out of a tool's JSON args.
pub fn parse_string(args: &Value, key: &str) -> Result<String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| CodeqaError::tool(format!("missing field: {key}")))
}

/// Helper to pull an optional string field out of a tool's JSON args.
pub fn parse_string_opt(args: &Value, key: &str) -> Option<String> {
    args.get(key).and_then(|v| v.as_str()).map(|s| s.to_string())
}

/// Helper to pull a required usize field out of a tool's JSON args.
pub fn parse_usize(args: &Value, key: &str) -> Result<usize> {
    args.get(key)
        .and_then(|v| v.as_u64())
        .map(|v| v as usize)
        .ok_or_else(|| CodeqaError::tool(format!("missing or invalid field: {key}")))
}

/// Helper to pull an optional usize field out of a tool's JSON args.
pub fn parse_usize_opt(args: &Value, key: &str) -> Option<usize> {
    args.get(key).and_then(|v| v.as_u64()).map(|v| v as usize)
}
