//! Inline tool-call normalization (§4.1).
//!
//! Providers that don't support native tool-call fields sometimes emit
//! the call as JSON in the message content instead (optionally fenced
//! in markdown). This scans for the first balanced `{...}` object and,
//! if it matches `{name, arguments}` against the tool catalogue, lifts
//! it into a structured call. Adapted from the teacher's
//! `extract_first_json_object`.

use crate::provider::ToolSpec;
use core::ToolCall;

/// Scans `s` for the first JSON object that parses and balances its
/// braces, ignoring braces inside string literals.
pub fn extract_first_json_object(s: &str) -> Option<String> {
    let bytes = s.as_bytes();
    let mut i = 0usize;

    while i < bytes.len() {
        if bytes[i] == b'{' {
            let start = i;
            let mut depth = 0i32;
            let mut in_string = false;
            let mut escaped = false;
            while i < bytes.len() {
                let b = bytes[i];
                if in_string {
                    if escaped {
                        escaped = false;
                    } else if b == b'\\' {
                        escaped = true;
                    } else if b == b'"' {
                        in_string = false;
                    }
                } else {
                    match b {
                        b'"' => in_string = true,
                        b'{' => depth += 1,
                        b'}' => {
                            depth -= 1;
                            if depth == 0 {
                                let end = i + 1;
                                let candidate = String::from_utf8_lossy(&bytes[start..end]).to_string();
                                if serde_json::from_str::<serde_json::Value>(&candidate).is_ok() {
                                    return Some(candidate);
                                }
                                break;
                            }
                        }
                        _ => {}
                    }
                }
                i += 1;
            }
        }
        i += 1;
    }
    None
}

fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

/// If `content` contains an inline JSON tool call matching a tool in
/// `catalogue` (by name, case-insensitively, ignoring separators), lift
/// it into a `ToolCall`. Otherwise returns `None` and the caller keeps
/// `content` unchanged.
pub fn normalize_inline_tool_call(content: &str, catalogue: &[ToolSpec]) -> Option<ToolCall> {
    let json_str = extract_first_json_object(content)?;
    let value: serde_json::Value = serde_json::from_str(&json_str).ok()?;
    let obj = value.as_object()?;

    let name = obj.get("name")?.as_str()?;
    let normalized = normalize_name(name);
    let matched = catalogue
        .iter()
        .find(|t| normalize_name(&t.name) == normalized)?;

    let arguments = obj
        .get("arguments")
        .cloned()
        .unwrap_or_else(|| serde_json::Value::Object(Default::default()));

    Some(ToolCall {
        id: format!("inline-{}", uuid::Uuid::new_v4()),
        function_name: matched.name.clone(),
        arguments: arguments.to_string(),
    })
}
