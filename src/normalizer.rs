//! JSON-in-string preprocessor.
//!
//! Message producers frequently embed JSON documents as string payloads,
//! sometimes escaped more than once. The normalizer walks a clone of the
//! input and replaces every string that parses as JSON with the parsed
//! node, recursing into replacements, under hard budgets for nodes
//! visited, replacements made, string length, and unescape layers.
//!
//! The transformation is standalone: it never touches an execution and
//! never mutates its argument.

use crate::error::{JexError, LimitError, RuntimeError};
use serde_json::Value as Json;
use tracing::trace;

#[derive(Debug, Clone, Copy)]
pub struct NormalizerOptions {
    /// How many unescape layers to peel from a single string.
    pub max_depth_per_string: u32,
    /// Total nodes visited, replacements included.
    pub max_nodes_visited: u64,
    /// Total string-to-node replacements.
    pub max_total_replacements: u64,
    /// Strings longer than this are not attempted.
    pub max_string_length: usize,
    /// When true, a string that looks like JSON but cannot be parsed even
    /// after unescaping raises instead of being left unchanged.
    pub strict: bool,
}

impl Default for NormalizerOptions {
    fn default() -> Self {
        NormalizerOptions {
            max_depth_per_string: 5,
            max_nodes_visited: 250_000,
            max_total_replacements: 50_000,
            max_string_length: 256_000,
            strict: false,
        }
    }
}

#[derive(Default)]
struct Counters {
    nodes: u64,
    replacements: u64,
}

/// Normalize a JSON tree, returning a transformed clone.
pub fn normalize(input: &Json, options: &NormalizerOptions) -> Result<Json, JexError> {
    let mut root = input.clone();
    let mut counters = Counters::default();
    walk(&mut root, options, &mut counters)?;
    trace!(
        nodes = counters.nodes,
        replacements = counters.replacements,
        "normalized document"
    );
    Ok(root)
}

fn walk(node: &mut Json, options: &NormalizerOptions, counters: &mut Counters) -> Result<(), JexError> {
    counters.nodes += 1;
    if counters.nodes > options.max_nodes_visited {
        return Err(LimitError::new("MaxNodesVisited", options.max_nodes_visited).into());
    }

    match node {
        Json::String(s) => {
            if s.len() > options.max_string_length {
                return Ok(());
            }
            let trimmed = s.trim();
            if !is_bracketed(trimmed) {
                return Ok(());
            }
            match parse_with_unescape(trimmed, options.max_depth_per_string) {
                Some(parsed) => {
                    counters.replacements += 1;
                    if counters.replacements > options.max_total_replacements {
                        return Err(LimitError::new(
                            "MaxTotalReplacements",
                            options.max_total_replacements,
                        )
                        .into());
                    }
                    *node = parsed;
                    // The replacement counts as a fresh node.
                    walk(node, options, counters)?;
                }
                None if options.strict => {
                    return Err(RuntimeError::new(format!(
                        "string looks like JSON but does not parse: '{}'",
                        preview(trimmed)
                    ))
                    .into())
                }
                None => {}
            }
        }
        Json::Array(items) => {
            for item in items {
                walk(item, options, counters)?;
            }
        }
        Json::Object(map) => {
            for value in map.values_mut() {
                walk(value, options, counters)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Candidate check: at least two characters, braced or bracketed.
fn is_bracketed(trimmed: &str) -> bool {
    if trimmed.len() < 2 {
        return false;
    }
    let first = trimmed.chars().next().unwrap();
    let last = trimmed.chars().last().unwrap();
    (first == '{' && last == '}') || (first == '[' && last == ']')
}

/// Try to parse; on failure, peel one escape layer by reading the text as
/// a JSON string literal and retry, up to `max_layers` times.
pub(crate) fn parse_with_unescape(text: &str, max_layers: u32) -> Option<Json> {
    let mut current = text.to_string();
    for _ in 0..=max_layers {
        if let Ok(parsed) = serde_json::from_str::<Json>(&current) {
            return Some(parsed);
        }
        let quoted = format!("\"{}\"", current);
        match serde_json::from_str::<String>(&quoted) {
            Ok(unescaped) if unescaped != current => current = unescaped,
            _ => return None,
        }
    }
    None
}

/// Does a trimmed string plausibly hold an embedded JSON payload?
pub(crate) fn looks_like_json(trimmed: &str) -> bool {
    matches!(trimmed.chars().next(), Some('{') | Some('[') | Some('"'))
}

/// Recursively parse JSON-looking strings in place. Each successful parse
/// along a nesting chain consumes one unit of `budget`.
pub(crate) fn expand_strings(node: &mut Json, budget: u32) {
    match node {
        Json::String(s) => {
            if budget == 0 {
                return;
            }
            let trimmed = s.trim();
            if !looks_like_json(trimmed) {
                return;
            }
            if let Ok(parsed) = serde_json::from_str::<Json>(trimmed) {
                *node = parsed;
                expand_strings_children(node, budget - 1);
            }
        }
        _ => expand_strings_children(node, budget),
    }
}

fn expand_strings_children(node: &mut Json, budget: u32) {
    match node {
        Json::String(_) => expand_strings(node, budget),
        Json::Array(items) => {
            for item in items {
                expand_strings(item, budget);
            }
        }
        Json::Object(map) => {
            for value in map.values_mut() {
                expand_strings(value, budget);
            }
        }
        _ => {}
    }
}

fn preview(s: &str) -> String {
    s.chars().take(40).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unescape_peels_one_layer_at_a_time() {
        // Raw text: {\"x\":1} — one layer of escaping.
        let escaped = r#"{\"x\":1}"#;
        assert_eq!(parse_with_unescape(escaped, 1), Some(json!({"x": 1})));
        assert_eq!(parse_with_unescape(escaped, 0), None);
    }

    #[test]
    fn oversized_strings_are_skipped() {
        let big = format!("{{\"k\":\"{}\"}}", "a".repeat(64));
        let doc = json!({ "data": big });
        let options = NormalizerOptions {
            max_string_length: 8,
            ..Default::default()
        };
        assert_eq!(normalize(&doc, &options).unwrap(), doc);
    }
}
