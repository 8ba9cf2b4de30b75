//! JSONPath built-ins: `jp1`, `jpAll`, `coalescePath`, `existsPath`.

use super::args;
use crate::context::ExecutionContext;
use crate::engine::FunctionEntry;
use crate::error::RuntimeError;
use crate::paths::{eval_query, parse_query};
use crate::value::Value;
use serde_json::Value as Json;

fn jp1(_ctx: &mut ExecutionContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let doc = args::json(&args, 0);
    let segments = parse_query(&args::string(&args, 1))?;
    Ok(eval_query(&doc, &segments)
        .first()
        .map(|node| Value::from_json_shallow(node))
        .unwrap_or(Value::Null))
}

fn jp_all(_ctx: &mut ExecutionContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let doc = args::json(&args, 0);
    let segments = parse_query(&args::string(&args, 1))?;
    let matches: Vec<Json> = eval_query(&doc, &segments)
        .into_iter()
        .cloned()
        .collect();
    Ok(Value::Json(Json::Array(matches)))
}

/// First path whose match exists and is non-null, else null.
fn coalesce_path(_ctx: &mut ExecutionContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let doc = args::json(&args, 0);
    for path in &args[1..] {
        let segments = parse_query(&path.as_string())?;
        if let Some(node) = eval_query(&doc, &segments).into_iter().next() {
            if !node.is_null() {
                return Ok(Value::from_json_shallow(node));
            }
        }
    }
    Ok(Value::Null)
}

/// True if the node is present, even when it holds JSON null.
fn exists_path(_ctx: &mut ExecutionContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let doc = args::json(&args, 0);
    let segments = parse_query(&args::string(&args, 1))?;
    Ok(Value::Boolean(!eval_query(&doc, &segments).is_empty()))
}

pub(super) fn builtins() -> Vec<(&'static str, FunctionEntry)> {
    vec![
        ("jp1", super::value_fn(2, Some(2), jp1)),
        ("jpAll", super::value_fn(2, Some(2), jp_all)),
        ("coalescePath", super::value_fn(2, None, coalesce_path)),
        ("existsPath", super::value_fn(2, Some(2), exists_path)),
    ]
}
