use common::CitationId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    CodeSearch,
    FileRead,
    Reference,
}

/// A verifiable source span backing part of an answer (§3). Owned by the
/// response it belongs to; never persisted separately. Dedup key is
/// `(file_path, start_line, end_line)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub id: CitationId,
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol_name: Option<String>,
    /// Clamped to `[0, 1]` by `new`.
    pub relevance_score: f32,
    pub source_type: SourceType,
}

impl Citation {
    pub fn new(
        file_path: impl Into<String>,
        start_line: usize,
        end_line: usize,
        content: impl Into<String>,
        symbol_name: Option<String>,
        relevance_score: f32,
        source_type: SourceType,
    ) -> Self {
        Self {
            id: CitationId::new(),
            file_path: file_path.into(),
            start_line,
            end_line,
            content: content.into(),
            symbol_name,
            relevance_score: relevance_score.clamp(0.0, 1.0),
            source_type,
        }
    }

    pub fn dedup_key(&self) -> (String, usize, usize) {
        (self.file_path.clone(), self.start_line, self.end_line)
    }
}
