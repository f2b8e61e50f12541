//! Citation service (C8, §4.8).
//!
//! Extracts verifiable `[path:line]` / `[path:start-end]` references
//! from tool results and assistant prose, deduplicates them by
//! `(filePath, startLine, endLine)`, and renumbers survivors to `[N]`
//! in the rewritten answer text.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use core::{Citation, SourceType};

/// Matches the `code_search` tool-result header block (§4.6/§4.8 step 1):
/// `--- [path:start-end] (type: symbol) [Score: s] ---` followed by a
/// fenced code block.
static TOOL_HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?s)---\s*\[([^\]:]+):(\d+)-(\d+)\]\s*\(([^)]*)\)\s*\[Score:\s*([0-9.]+)\]\s*---\s*```[\w+-]*\n(.*?)```"#,
    )
    .unwrap()
});

/// Matches a `[path:line]` or `[path:start-end]` reference anywhere in
/// free text (§4.8 step 2). Bare `[N]` markers (no colon) never match,
/// so already-renumbered citations are left alone on a second pass.
static CONTENT_REF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\[([^\]:]+):(\d+)(?:-(\d+))?\]"#).unwrap());

/// The grounded output of citation extraction (§4.8).
#[derive(Debug, Clone, Serialize)]
pub struct GroundedContent {
    pub content: String,
    pub citations: Vec<Citation>,
    /// `path:start-end` → 1-based citation index.
    pub citation_map: HashMap<String, usize>,
}

fn citation_key(path: &str, start: usize, end: usize) -> String {
    format!("{path}:{start}-{end}")
}

/// Step 1: extract citations embedded in tool-result strings (the
/// `code_search` header-block format), sorted descending by score.
pub fn extract_from_tool_results(tool_results: &[String]) -> Vec<Citation> {
    let mut out = Vec::new();
    for result in tool_results {
        for cap in TOOL_HEADER_RE.captures_iter(result) {
            let path = cap[1].trim().to_string();
            let Ok(start) = cap[2].parse::<usize>() else { continue };
            let Ok(end) = cap[3].parse::<usize>() else { continue };
            let label = cap[4].trim();
            let Ok(score) = cap[5].parse::<f32>() else { continue };
            let body = cap[6].trim_end().to_string();

            let symbol_name = label
                .split_once(':')
                .map(|(_, name)| name.trim().to_string())
                .filter(|s| !s.is_empty());

            out.push(Citation::new(path, start, end, body, symbol_name, score, SourceType::CodeSearch));
        }
    }
    out.sort_by(|a, b| b.relevance_score.partial_cmp(&a.relevance_score).unwrap_or(std::cmp::Ordering::Equal));
    out
}

/// Step 2: extract `[path:line]`/`[path:start-end]` references from the
/// assistant's final content. These carry no score of their own; they
/// are assigned full relevance since the model chose to cite them
/// directly.
pub fn extract_from_content(content: &str) -> Vec<Citation> {
    let mut out = Vec::new();
    for cap in CONTENT_REF_RE.captures_iter(content) {
        let path = cap[1].trim().to_string();
        let Ok(start) = cap[2].parse::<usize>() else { continue };
        let end = cap
            .get(3)
            .and_then(|m| m.as_str().parse::<usize>().ok())
            .unwrap_or(start);
        out.push(Citation::new(path, start, end, String::new(), None, 1.0, SourceType::Reference));
    }
    out
}

/// Step 3: dedup by `(filePath, startLine, endLine)`, first occurrence
/// wins (so tool-result citations, extracted first, keep their score
/// and body over a bare content reference to the same span).
fn dedup_citations(citations: Vec<Citation>) -> Vec<Citation> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for c in citations {
        if seen.insert(c.dedup_key()) {
            out.push(c);
        }
    }
    out
}

/// Finds the citation (if any) whose span contains `line`, preferring
/// an exact `(start, end)` match when the reference already names a
/// range.
fn find_matching_citation<'a>(
    citations: &'a [Citation],
    path: &str,
    start: usize,
    end: usize,
) -> Option<&'a Citation> {
    citations
        .iter()
        .find(|c| c.file_path == path && c.start_line == start && c.end_line == end)
        .or_else(|| {
            citations
                .iter()
                .find(|c| c.file_path == path && c.start_line <= start && start <= c.end_line)
        })
}

/// Step 4: assign 1-based indices and rewrite matched `[path:line]`
/// references in `content` to `[N]`. References whose target isn't in
/// the citation set are left intact.
pub fn renumber(content: &str, citations: &[Citation]) -> (String, HashMap<String, usize>) {
    let mut citation_map = HashMap::new();
    for (idx, c) in citations.iter().enumerate() {
        citation_map.insert(citation_key(&c.file_path, c.start_line, c.end_line), idx + 1);
    }

    let rewritten = CONTENT_REF_RE.replace_all(content, |cap: &regex::Captures| {
        let path = cap[1].trim().to_string();
        let Ok(start) = cap[2].parse::<usize>() else {
            return cap[0].to_string();
        };
        let end = cap
            .get(3)
            .and_then(|m| m.as_str().parse::<usize>().ok())
            .unwrap_or(start);

        match find_matching_citation(citations, &path, start, end) {
            Some(found) => {
                let idx = citation_map[&citation_key(&found.file_path, found.start_line, found.end_line)];
                format!("[{idx}]")
            }
            None => cap[0].to_string(),
        }
    });

    (rewritten.into_owned(), citation_map)
}

/// Runs the full pipeline (§4.8): extract from tool results, extract
/// from content, dedup, then renumber and rewrite.
pub fn ground(content: &str, tool_results: &[String]) -> GroundedContent {
    let mut citations = extract_from_tool_results(tool_results);
    citations.extend(extract_from_content(content));
    let citations = dedup_citations(citations);

    let (rewritten, citation_map) = renumber(content, &citations);
    GroundedContent {
        content: rewritten,
        citations,
        citation_map,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tool_result() -> String {
        "--- [src/auth.rs:10-20] (function: authenticate) [Score: 0.91] ---\n```rust\nfn authenticate() {}\n```\n".to_string()
    }

    #[test]
    fn extracts_header_block_citation_with_symbol_and_score() {
        let citations = extract_from_tool_results(&[sample_tool_result()]);
        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].file_path, "src/auth.rs");
        assert_eq!(citations[0].start_line, 10);
        assert_eq!(citations[0].end_line, 20);
        assert_eq!(citations[0].symbol_name.as_deref(), Some("authenticate"));
        assert!((citations[0].relevance_score - 0.91).abs() < 1e-6);
    }

    #[test]
    fn sorts_tool_result_citations_descending_by_score() {
        let a = "--- [a.rs:1-2] (function: a) [Score: 0.2] ---\n```\nx\n```\n";
        let b = "--- [b.rs:1-2] (function: b) [Score: 0.9] ---\n```\ny\n```\n";
        let citations = extract_from_tool_results(&[a.to_string(), b.to_string()]);
        assert_eq!(citations[0].file_path, "b.rs");
        assert_eq!(citations[1].file_path, "a.rs");
    }

    #[test]
    fn duplicate_content_references_collapse_to_one_citation_and_one_marker() {
        let content = "See [src/a.cs:10-20] and [src/a.cs:10-20].";
        let grounded = ground(content, &[]);
        assert_eq!(grounded.citations.len(), 1);
        assert_eq!(grounded.content.matches("[1]").count(), 2);
    }

    #[test]
    fn tool_result_citation_wins_dedup_over_bare_content_reference() {
        let content = format!("Answer referencing [src/auth.rs:10-20].");
        let grounded = ground(&content, &[sample_tool_result()]);
        assert_eq!(grounded.citations.len(), 1);
        assert_eq!(grounded.citations[0].symbol_name.as_deref(), Some("authenticate"));
        assert!(grounded.content.contains("[1]"));
    }

    #[test]
    fn unmatched_reference_is_left_intact() {
        let content = "See [src/unknown.rs:5-6] for details.";
        let grounded = ground(content, &[]);
        assert!(grounded.citations.is_empty());
        assert_eq!(grounded.content, content);
    }

    #[test]
    fn single_line_reference_matches_a_containing_range_citation() {
        let content = format!("See [src/auth.rs:15] for the check.");
        let grounded = ground(&content, &[sample_tool_result()]);
        assert_eq!(grounded.citations.len(), 1);
        assert_eq!(grounded.content, "See [1] for the check.");
    }
}
