//! Type coercion and inspection built-ins.

use crate::context::ExecutionContext;
use crate::engine::FunctionEntry;
use crate::error::RuntimeError;
use crate::value::Value;

fn to_string(_ctx: &mut ExecutionContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(Value::String(args[0].as_string()))
}

fn to_number(_ctx: &mut ExecutionContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(Value::Number(args[0].as_number()))
}

fn to_bool(_ctx: &mut ExecutionContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(Value::Boolean(args[0].as_bool()))
}

fn to_date(_ctx: &mut ExecutionContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(args[0]
        .as_datetime()
        .map(Value::DateTime)
        .unwrap_or(Value::Null))
}

fn is_null(_ctx: &mut ExecutionContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(Value::Boolean(args[0].is_null_like()))
}

/// Empty means null, the empty string, an empty array, or an empty object.
fn is_empty(_ctx: &mut ExecutionContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(Value::Boolean(args[0].is_empty()))
}

fn type_of(_ctx: &mut ExecutionContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(Value::String(args[0].type_of().to_string()))
}

pub(super) fn builtins() -> Vec<(&'static str, FunctionEntry)> {
    vec![
        ("toString", super::value_fn(1, Some(1), to_string)),
        ("toNumber", super::value_fn(1, Some(1), to_number)),
        ("toBool", super::value_fn(1, Some(1), to_bool)),
        ("toDate", super::value_fn(1, Some(1), to_date)),
        ("isNull", super::value_fn(1, Some(1), is_null)),
        ("isEmpty", super::value_fn(1, Some(1), is_empty)),
        ("typeOf", super::value_fn(1, Some(1), type_of)),
    ]
}
