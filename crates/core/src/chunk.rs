use common::{ChunkId, RepositoryId};
use serde::{Deserialize, Serialize};

/// The kind of source region a chunk spans (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    Code,
    Class,
    Method,
    Function,
    Comment,
}

impl ChunkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkType::Code => "code",
            ChunkType::Class => "class",
            ChunkType::Method => "method",
            ChunkType::Function => "function",
            ChunkType::Comment => "comment",
        }
    }
}

/// Structural metadata attached to a chunk (§3).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub references: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complexity: Option<u32>,
}

/// A contiguous, embeddable span of source with symbolic metadata (§3).
///
/// Invariants: `start_line >= 1 && end_line >= start_line`; `language` is
/// drawn from the fixed extension table (`index::language_for_extension`);
/// a chunk belongs to exactly one file. Chunks are created during
/// ingestion, wholesale deleted and recreated on re-index, and never
/// mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeChunk {
    pub id: ChunkId,
    pub repository_id: RepositoryId,
    pub file_path: String,
    pub file_name: String,
    pub language: String,
    pub content: String,
    pub start_line: usize,
    pub end_line: usize,
    pub chunk_type: ChunkType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol_name: Option<String>,
    /// Fixed dimensionality `D` per deployment; empty until embedded.
    #[serde(default)]
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub metadata: ChunkMetadata,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl CodeChunk {
    /// Number of source lines spanned, inclusive on both ends.
    pub fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }

    /// `(filePath, startLine, endLine)` — not a dedup key for chunks
    /// themselves (a file may legitimately have two non-overlapping
    /// chunks), but used when chunks are cited or refilled.
    pub fn range_key(&self) -> (String, usize, usize) {
        (self.file_path.clone(), self.start_line, self.end_line)
    }

    /// Whether `start_line`/`end_line` satisfy the chunk invariants and
    /// the content's line count matches the declared range (§8).
    pub fn is_well_formed(&self) -> bool {
        self.start_line >= 1
            && self.end_line >= self.start_line
            && self.content.lines().count() == self.line_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CodeChunk {
        CodeChunk {
            id: ChunkId::new(),
            repository_id: RepositoryId::new(),
            file_path: "src/a.rs".to_string(),
            file_name: "a.rs".to_string(),
            language: "rust".to_string(),
            content: "fn a() {}\nfn b() {}".to_string(),
            start_line: 10,
            end_line: 11,
            chunk_type: ChunkType::Function,
            symbol_name: Some("a".to_string()),
            embedding: vec![0.1, 0.2],
            metadata: ChunkMetadata::default(),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn well_formed_chunk_passes_invariant_checks() {
        let c = sample();
        assert!(c.is_well_formed());
        assert_eq!(c.line_count(), 2);
    }

    #[test]
    fn malformed_chunk_fails_line_count_check() {
        let mut c = sample();
        c.content = "only one line".to_string();
        assert!(!c.is_well_formed());
    }

    #[test]
    fn chunk_type_as_str_matches_spec_tokens() {
        assert_eq!(ChunkType::Method.as_str(), "method");
        assert_eq!(ChunkType::Class.as_str(), "class");
    }
}
