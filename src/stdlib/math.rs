//! Math built-ins over the decimal coercion.

use super::args;
use crate::context::ExecutionContext;
use crate::engine::FunctionEntry;
use crate::error::RuntimeError;
use crate::value::Value;
use rust_decimal::RoundingStrategy;

fn abs(_ctx: &mut ExecutionContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(Value::Number(args::number(&args, 0).abs()))
}

fn min(_ctx: &mut ExecutionContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let a = args::number(&args, 0);
    let b = args::number(&args, 1);
    Ok(Value::Number(if a <= b { a } else { b }))
}

fn max(_ctx: &mut ExecutionContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let a = args::number(&args, 0);
    let b = args::number(&args, 1);
    Ok(Value::Number(if a >= b { a } else { b }))
}

/// `round(n[, digits])`, midpoint away from zero.
fn round(_ctx: &mut ExecutionContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let n = args::number(&args, 0);
    let digits = if args.len() > 1 {
        args::integer(&args, 1).max(0) as u32
    } else {
        0
    };
    Ok(Value::Number(n.round_dp_with_strategy(
        digits,
        RoundingStrategy::MidpointAwayFromZero,
    )))
}

fn floor(_ctx: &mut ExecutionContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(Value::Number(args::number(&args, 0).floor()))
}

fn ceil(_ctx: &mut ExecutionContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(Value::Number(args::number(&args, 0).ceil()))
}

pub(super) fn builtins() -> Vec<(&'static str, FunctionEntry)> {
    vec![
        ("abs", super::value_fn(1, Some(1), abs)),
        ("min", super::value_fn(2, Some(2), min)),
        ("max", super::value_fn(2, Some(2), max)),
        ("round", super::value_fn(1, Some(2), round)),
        ("floor", super::value_fn(1, Some(1), floor)),
        ("ceil", super::value_fn(1, Some(1), ceil)),
    ]
}
