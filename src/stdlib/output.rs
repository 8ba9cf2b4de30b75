//! Output helpers.

use super::args;
use crate::context::ExecutionContext;
use crate::engine::FunctionEntry;
use crate::error::RuntimeError;
use crate::paths::{parse_set_path, set_by_path, PathRoot};
use crate::value::Value;
use serde_json::Value as Json;

/// Mutating: `setPath(target, pathStr, value)` — same path semantics as
/// `%set`, applied to the node held by the first argument's place.
fn set_path(_ctx: &mut ExecutionContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let path_text = args::string(&args, 1);
    let (root, segments) = parse_set_path(&path_text)?;
    if matches!(root, PathRoot::In | PathRoot::Meta) {
        return Err(RuntimeError::new(format!(
            "cannot write through read-only root in '{}'",
            path_text
        )));
    }

    let mut node = match &args[0] {
        Value::Null | Value::Json(Json::Null) => Json::Object(serde_json::Map::new()),
        Value::Json(node) => node.clone(),
        other => {
            return Err(RuntimeError::new(format!(
                "setPath target must be a JSON node, got {}",
                other.type_of()
            )))
        }
    };
    let value = args.get(2).map(|v| v.to_json()).unwrap_or(Json::Null);
    set_by_path(&mut node, &segments, value, &path_text)?;
    Ok(Value::Json(node))
}

pub(super) fn builtins() -> Vec<(&'static str, FunctionEntry)> {
    vec![("setPath", super::mutating_fn(3, Some(3), set_path))]
}
