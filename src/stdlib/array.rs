//! Array and object builders and access.

use super::args;
use crate::context::ExecutionContext;
use crate::engine::FunctionEntry;
use crate::error::RuntimeError;
use crate::paths::{eval_query, parse_query};
use crate::value::Value;
use serde_json::Value as Json;

fn arr(_ctx: &mut ExecutionContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(Value::Json(Json::Array(
        args.iter().map(|v| v.to_json()).collect(),
    )))
}

/// `obj(k1, v1, k2, v2, ...)` — an odd trailing key is dropped.
fn obj(_ctx: &mut ExecutionContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let mut map = serde_json::Map::new();
    let mut pairs = args.chunks_exact(2);
    for pair in &mut pairs {
        map.insert(pair[0].as_string(), pair[1].to_json());
    }
    Ok(Value::Json(Json::Object(map)))
}

/// Mutating: appends to the array held by the first argument's place. An
/// unset variable starts a fresh array.
fn push(_ctx: &mut ExecutionContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let mut array = match &args[0] {
        Value::Null | Value::Json(Json::Null) => Vec::new(),
        Value::Json(Json::Array(elements)) => elements.clone(),
        other => {
            return Err(RuntimeError::new(format!(
                "push target must be an array, got {}",
                other.type_of()
            )))
        }
    };
    array.push(args.get(1).map(|v| v.to_json()).unwrap_or(Json::Null));
    Ok(Value::Json(Json::Array(array)))
}

fn first(_ctx: &mut ExecutionContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match &args[0] {
        Value::Json(Json::Array(elements)) => Ok(elements
            .first()
            .map(Value::from_json_shallow)
            .unwrap_or(Value::Null)),
        _ => Ok(Value::Null),
    }
}

fn last(_ctx: &mut ExecutionContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match &args[0] {
        Value::Json(Json::Array(elements)) => Ok(elements
            .last()
            .map(Value::from_json_shallow)
            .unwrap_or(Value::Null)),
        _ => Ok(Value::Null),
    }
}

fn count(_ctx: &mut ExecutionContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let n = match &args[0] {
        Value::Json(Json::Array(elements)) => elements.len(),
        _ => 0,
    };
    Ok(Value::Number(n.into()))
}

/// `indexBy(array, keyPath)` — build an object keyed by the JSONPath match
/// inside each element; duplicate keys keep the last element.
fn index_by(_ctx: &mut ExecutionContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let segments = parse_query(&args::string(&args, 1))?;
    let mut map = serde_json::Map::new();
    if let Value::Json(Json::Array(elements)) = &args[0] {
        for element in elements {
            if let Some(key_node) = eval_query(element, &segments).into_iter().next() {
                let key = Value::from_json_shallow(key_node).as_string();
                map.insert(key, element.clone());
            }
        }
    }
    Ok(Value::Json(Json::Object(map)))
}

fn lookup(_ctx: &mut ExecutionContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let key = args::string(&args, 1);
    match &args[0] {
        Value::Json(Json::Object(map)) => Ok(map
            .get(&key)
            .map(Value::from_json_shallow)
            .unwrap_or(Value::Null)),
        _ => Ok(Value::Null),
    }
}

pub(super) fn builtins() -> Vec<(&'static str, FunctionEntry)> {
    vec![
        ("arr", super::value_fn(0, None, arr)),
        ("obj", super::value_fn(0, None, obj)),
        ("push", super::mutating_fn(2, Some(2), push)),
        ("first", super::value_fn(1, Some(1), first)),
        ("last", super::value_fn(1, Some(1), last)),
        ("count", super::value_fn(1, Some(1), count)),
        ("indexBy", super::value_fn(2, Some(2), index_by)),
        ("lookup", super::value_fn(2, Some(2), lookup)),
    ]
}
