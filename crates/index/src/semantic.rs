//! Regex-based semantic chunking (§4.3). An acceptable approximation of
//! AST-aware chunking: brace-delimited languages are scanned with
//! balanced-brace body matching, indentation-delimited languages by
//! header span.

use once_cell::sync::Lazy;
use regex::Regex;

use common::{ChunkId, RepositoryId};
use core::{ChunkMetadata, ChunkType, CodeChunk};

static NAMESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*(?:namespace|package)\s+([\w.:]+)").unwrap());

static CLASS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(?:(?:pub(?:\([^)]*\))?|public|private|protected|internal|export|default|abstract)\s+)*(class|interface|struct|enum|trait)\s+(\w+)",
    )
    .unwrap()
});

/// Rust's `impl Foo { .. }` / `impl Trait for Foo { .. }` attach methods
/// to a type declared elsewhere; treated as an additional class-like
/// body keyed on the target type name.
static IMPL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*impl(?:<[^>]*>)?\s+(?:[\w:<>]+\s+for\s+)?([\w]+)").unwrap()
});

static FUNCTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(?:(?:pub(?:\([^)]*\))?|public|private|protected|internal|static|async|override|virtual|export|default)\s+)*(?:function|def|fn|func)\s+(\w+)\s*\(",
    )
    .unwrap()
});

static MEMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:public|private|protected|internal)\b[^=;{}\n]*?\b(\w+)\s*\([^;{}]*\)\s*\{")
        .unwrap()
});

static HEADER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\s*)(class|def)\s+(\w+)").unwrap());

/// Maps byte offsets to 1-based line numbers.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(content: &str) -> Self {
        let mut starts = vec![0usize];
        for (i, b) in content.bytes().enumerate() {
            if b == b'\n' {
                starts.push(i + 1);
            }
        }
        Self { starts }
    }

    fn line_for_byte(&self, byte: usize) -> usize {
        match self.starts.binary_search(&byte) {
            Ok(idx) => idx + 1,
            Err(idx) => idx,
        }
    }
}

/// Finds the index of the `}` balancing the `{` at `open_idx`, treating
/// braces inside single- or double-quoted string literals as inert.
fn find_balanced_end(bytes: &[u8], open_idx: usize) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_str: Option<u8> = None;
    let mut escaped = false;
    let mut i = open_idx;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = in_str {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == q {
                in_str = None;
            }
        } else {
            match b {
                b'"' | b'\'' => in_str = Some(b),
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }
        i += 1;
    }
    None
}

/// Scans forward from `from` for the next `{` or `;`, whichever comes
/// first. A `;` before any `{` means a declaration with no body
/// (interface method signature, forward declaration).
fn next_brace_or_semicolon(bytes: &[u8], from: usize) -> Option<(usize, bool)> {
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => return Some((i, true)),
            b';' => return Some((i, false)),
            _ => {}
        }
        i += 1;
    }
    None
}

fn extract_namespace(content: &str) -> Option<String> {
    NAMESPACE_RE.captures(content).map(|c| c[1].to_string())
}

fn build_chunk(
    repository_id: &RepositoryId,
    relative_path: &str,
    file_name: &str,
    language_name: &str,
    content: &str,
    start_line: usize,
    end_line: usize,
    chunk_type: ChunkType,
    symbol_name: Option<String>,
    parent_class: Option<String>,
    namespace: Option<String>,
) -> CodeChunk {
    let lines: Vec<&str> = content.lines().collect();
    let span = lines
        .get(start_line.saturating_sub(1)..=end_line.saturating_sub(1).min(lines.len().saturating_sub(1)))
        .unwrap_or(&[]);
    CodeChunk {
        id: ChunkId::new(),
        repository_id: repository_id.clone(),
        file_path: relative_path.to_string(),
        file_name: file_name.to_string(),
        language: language_name.to_string(),
        content: span.join("\n"),
        start_line,
        end_line,
        chunk_type,
        symbol_name,
        embedding: Vec::new(),
        metadata: ChunkMetadata {
            parent_class,
            namespace,
            imports: Vec::new(),
            references: Vec::new(),
            complexity: None,
        },
        created_at: chrono::Utc::now(),
    }
}

/// Semantic chunking for brace-delimited languages (§4.3). Returns an
/// empty vector when no class or function declarations are found, so
/// the caller falls back to the size-based chunker.
pub fn semantic_brace_chunks(
    repository_id: &RepositoryId,
    relative_path: &str,
    file_name: &str,
    language_name: &str,
    content: &str,
) -> Vec<CodeChunk> {
    let bytes = content.as_bytes();
    let line_index = LineIndex::new(content);
    let namespace = extract_namespace(content);

    let mut chunks = Vec::new();
    let mut occupied: Vec<(usize, usize)> = Vec::new();

    let mut class_like: Vec<(usize, usize, String)> = Vec::new();
    for cap in CLASS_RE.captures_iter(content) {
        let whole = cap.get(0).unwrap();
        class_like.push((whole.start(), whole.end(), cap[2].to_string()));
    }
    for cap in IMPL_RE.captures_iter(content) {
        let whole = cap.get(0).unwrap();
        class_like.push((whole.start(), whole.end(), cap[1].to_string()));
    }
    class_like.sort_by_key(|c| c.0);

    for (start, end, class_name) in class_like {
        let Some((brace_idx, has_body)) = next_brace_or_semicolon(bytes, end) else {
            continue;
        };
        if !has_body {
            continue;
        }
        let Some(body_end) = find_balanced_end(bytes, brace_idx) else {
            continue;
        };

        let class_start_line = line_index.line_for_byte(start);
        let class_end_line = line_index.line_for_byte(body_end);
        occupied.push((start, body_end));

        let body = &content[brace_idx + 1..body_end];
        let body_offset = brace_idx + 1;

        let mut members: Vec<CodeChunk> = Vec::new();
        let mut member_spans: Vec<(usize, usize)> = Vec::new();
        let mut candidates: Vec<(usize, usize, String)> = Vec::new();
        for m in FUNCTION_RE.captures_iter(body) {
            let whole = m.get(0).unwrap();
            candidates.push((whole.start(), whole.end(), m[1].to_string()));
        }
        for m in MEMBER_RE.captures_iter(body) {
            let whole = m.get(0).unwrap();
            candidates.push((whole.start(), whole.end(), m[1].to_string()));
        }
        candidates.sort_by_key(|c| c.0);

        for (rel_start, rel_end, name) in candidates {
            if member_spans.iter().any(|(s, e)| rel_start >= *s && rel_start < *e) {
                continue;
            }
            let abs_end = body_offset + rel_end;
            let Some((brace_idx, has_body)) = next_brace_or_semicolon(bytes, abs_end) else {
                continue;
            };
            if !has_body {
                continue;
            }
            let Some(member_body_end) = find_balanced_end(bytes, brace_idx) else {
                continue;
            };
            let abs_start = body_offset + rel_start;
            member_spans.push((rel_start, member_body_end.saturating_sub(body_offset) + 1));

            members.push(build_chunk(
                repository_id,
                relative_path,
                file_name,
                language_name,
                content,
                line_index.line_for_byte(abs_start),
                line_index.line_for_byte(member_body_end),
                ChunkType::Method,
                Some(name),
                Some(class_name.clone()),
                namespace.clone(),
            ));
        }

        if members.is_empty() {
            chunks.push(build_chunk(
                repository_id,
                relative_path,
                file_name,
                language_name,
                content,
                class_start_line,
                class_end_line,
                ChunkType::Class,
                Some(class_name),
                None,
                namespace.clone(),
            ));
        } else {
            chunks.extend(members);
        }
    }

    for cap in FUNCTION_RE.captures_iter(content) {
        let whole = cap.get(0).unwrap();
        if occupied.iter().any(|(s, e)| whole.start() >= *s && whole.start() < *e) {
            continue;
        }
        let Some((brace_idx, has_body)) = next_brace_or_semicolon(bytes, whole.end()) else {
            continue;
        };
        if !has_body {
            continue;
        }
        let Some(body_end) = find_balanced_end(bytes, brace_idx) else {
            continue;
        };
        chunks.push(build_chunk(
            repository_id,
            relative_path,
            file_name,
            language_name,
            content,
            line_index.line_for_byte(whole.start()),
            line_index.line_for_byte(body_end),
            ChunkType::Function,
            Some(cap[1].to_string()),
            None,
            namespace.clone(),
        ));
    }

    chunks.sort_by_key(|c| c.start_line);
    chunks
}

/// Semantic chunking for indentation-delimited languages (§4.3). A
/// header (`class X` / `def X`) spans to the next header at the same
/// or a shallower indent, or EOF.
pub fn semantic_indent_chunks(
    repository_id: &RepositoryId,
    relative_path: &str,
    file_name: &str,
    language_name: &str,
    content: &str,
) -> Vec<CodeChunk> {
    let lines: Vec<&str> = content.lines().collect();
    let mut headers: Vec<(usize, usize, String, String)> = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if let Some(cap) = HEADER_RE.captures(line) {
            headers.push((i + 1, cap[1].len(), cap[2].to_string(), cap[3].to_string()));
        }
    }

    if headers.is_empty() {
        return Vec::new();
    }

    let mut stack: Vec<(usize, String)> = Vec::new();
    let mut chunks = Vec::new();

    for idx in 0..headers.len() {
        let (line_no, indent, keyword, name) = headers[idx].clone();
        while let Some(&(top_indent, _)) = stack.last() {
            if top_indent >= indent {
                stack.pop();
            } else {
                break;
            }
        }

        let mut end_line = lines.len();
        for later in headers.iter().skip(idx + 1) {
            if later.1 <= indent {
                end_line = later.0.saturating_sub(1);
                break;
            }
        }
        end_line = end_line.max(line_no);

        let parent = stack.last().map(|(_, n)| n.clone());
        let chunk_type = if keyword == "class" {
            ChunkType::Class
        } else if parent.is_some() {
            ChunkType::Method
        } else {
            ChunkType::Function
        };
        let parent_class = if keyword == "class" { None } else { parent };

        chunks.push(build_chunk(
            repository_id,
            relative_path,
            file_name,
            language_name,
            content,
            line_no,
            end_line,
            chunk_type,
            Some(name.clone()),
            parent_class,
            None,
        ));

        if keyword == "class" {
            stack.push((indent, name));
        }
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo_id() -> RepositoryId {
        RepositoryId::new()
    }

    #[test]
    fn brace_language_splits_class_into_one_chunk_per_method() {
        let src = "pub struct Foo {\n    x: i32,\n}\n\nimpl Foo {\n    pub fn bar(&self) -> i32 {\n        self.x\n    }\n\n    pub fn baz(&self) {\n        println!(\"{}\", self.x);\n    }\n}\n";
        let chunks = semantic_brace_chunks(&repo_id(), "src/foo.rs", "foo.rs", "rust", src);
        assert!(chunks.iter().any(|c| c.symbol_name.as_deref() == Some("bar")));
    }

    #[test]
    fn brace_scan_ignores_braces_inside_string_literals() {
        let src = "fn weird() {\n    let s = \"a{b}c\";\n    println!(\"{}\", s);\n}\n";
        let bytes = src.as_bytes();
        let open = src.find('{').unwrap();
        let end = find_balanced_end(bytes, open).unwrap();
        assert_eq!(&src[open..=end], src.trim_end());
    }

    #[test]
    fn no_class_or_function_declarations_returns_empty() {
        let src = "const X: i32 = 5;\nconst Y: i32 = 6;\n";
        let chunks = semantic_brace_chunks(&repo_id(), "a.rs", "a.rs", "rust", src);
        assert!(chunks.is_empty());
    }

    #[test]
    fn indent_language_spans_class_and_nested_method() {
        let src = "class Foo:\n    def bar(self):\n        return 1\n\n    def baz(self):\n        return 2\n\ndef top_level():\n    return 3\n";
        let chunks = semantic_indent_chunks(&repo_id(), "foo.py", "foo.py", "python", src);
        let bar = chunks.iter().find(|c| c.symbol_name.as_deref() == Some("bar")).unwrap();
        assert_eq!(bar.metadata.parent_class.as_deref(), Some("Foo"));
        assert_eq!(bar.chunk_type, ChunkType::Method);

        let top = chunks.iter().find(|c| c.symbol_name.as_deref() == Some("top_level")).unwrap();
        assert_eq!(top.chunk_type, ChunkType::Function);
        assert!(top.metadata.parent_class.is_none());
    }

    #[test]
    fn interface_method_without_body_does_not_count_as_a_member() {
        let src = "public interface Greeter {\n    String greet(String name);\n}\n";
        let chunks = semantic_brace_chunks(&repo_id(), "Greeter.java", "Greeter.java", "java", src);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_type, ChunkType::Class);
        assert_eq!(chunks[0].symbol_name.as_deref(), Some("Greeter"));
    }
}
