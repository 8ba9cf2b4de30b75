//! JSON-in-string expansion built-ins: `expandJson` and `expandJsonAll`.
//!
//! Both clone their input; the original node is never mutated. They share
//! the parse helpers with the standalone normalizer.

use super::args;
use crate::context::ExecutionContext;
use crate::engine::FunctionEntry;
use crate::error::RuntimeError;
use crate::normalizer::expand_strings;
use crate::paths::{lookup_mut, parse_set_path};
use crate::value::Value;

const DEFAULT_MAX_DEPTH: u32 = 10;

fn max_depth(values: &[Value], idx: usize) -> u32 {
    if values.len() > idx {
        args::integer(values, idx).clamp(0, u32::MAX as i64) as u32
    } else {
        DEFAULT_MAX_DEPTH
    }
}

/// `expandJson(json, pathStr[, maxDepth])` — parse the string at the given
/// path and recursively expand JSON-looking string children.
fn expand_json(_ctx: &mut ExecutionContext, values: Vec<Value>) -> Result<Value, RuntimeError> {
    let mut doc = args::json(&values, 0);
    let path_text = args::string(&values, 1);
    let (_, segments) = parse_set_path(&path_text)?;
    let budget = max_depth(&values, 2);

    if let Some(node) = lookup_mut(&mut doc, &segments) {
        expand_strings(node, budget);
    }
    Ok(Value::Json(doc))
}

/// `expandJsonAll(json[, maxDepth])` — walk the whole tree expanding every
/// string whose trimmed form starts with `{`, `[`, or `"` and parses.
fn expand_json_all(_ctx: &mut ExecutionContext, values: Vec<Value>) -> Result<Value, RuntimeError> {
    let mut doc = args::json(&values, 0);
    let budget = max_depth(&values, 1);
    expand_strings(&mut doc, budget);
    Ok(Value::Json(doc))
}

pub(super) fn builtins() -> Vec<(&'static str, FunctionEntry)> {
    vec![
        ("expandJson", super::value_fn(2, Some(3), expand_json)),
        ("expandJsonAll", super::value_fn(1, Some(2), expand_json_all)),
    ]
}
