//! Concrete agent tools (C6, §4.6): `code_search`, `read_file`,
//! `find_references`, `explain_code`. Each implements `toolkit::Tool`
//! over the shared `ToolContext` (C2/C5/C1), returning a plain
//! human-readable string the citation service can re-parse.

mod code_search;
mod explain_code;
mod find_references;
mod read_file;

pub use code_search::CodeSearchTool;
pub use explain_code::ExplainCodeTool;
pub use find_references::FindReferencesTool;
pub use read_file::ReadFileTool;

use std::sync::Arc;

use toolkit::{Tool, ToolRegistry};

/// Builds the standard tool registry (§4.6), with all four tools
/// registered.
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register_all(vec![
        Arc::new(CodeSearchTool) as Arc<dyn Tool>,
        Arc::new(ReadFileTool) as Arc<dyn Tool>,
        Arc::new(FindReferencesTool) as Arc<dyn Tool>,
        Arc::new(ExplainCodeTool) as Arc<dyn Tool>,
    ]);
    registry
}
