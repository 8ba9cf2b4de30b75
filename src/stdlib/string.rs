//! String built-ins.

use super::args;
use crate::context::ExecutionContext;
use crate::engine::FunctionEntry;
use crate::error::RuntimeError;
use crate::value::Value;
use regex::Regex;
use serde_json::Value as Json;
use std::time::Instant;

fn trim(_ctx: &mut ExecutionContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(Value::String(args::string(&args, 0).trim().to_string()))
}

fn lower(_ctx: &mut ExecutionContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(Value::String(args::string(&args, 0).to_lowercase()))
}

fn upper(_ctx: &mut ExecutionContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(Value::String(args::string(&args, 0).to_uppercase()))
}

/// `substr(s, start[, len])` — start is clamped into the string, a negative
/// length yields the empty string.
fn substr(_ctx: &mut ExecutionContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let text: Vec<char> = args::string(&args, 0).chars().collect();
    let start = args::integer(&args, 1).max(0) as usize;
    let start = start.min(text.len());
    let result: String = match args.get(2) {
        Some(len) => {
            let len = len.as_number();
            if len.is_sign_negative() {
                return Ok(Value::String(String::new()));
            }
            let len = args::integer(&args, 2) as usize;
            text[start..start.saturating_add(len).min(text.len())]
                .iter()
                .collect()
        }
        None => text[start..].iter().collect(),
    };
    Ok(Value::String(result))
}

fn left(_ctx: &mut ExecutionContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let text: Vec<char> = args::string(&args, 0).chars().collect();
    let n = args::integer(&args, 1).max(0) as usize;
    Ok(Value::String(text[..n.min(text.len())].iter().collect()))
}

fn right(_ctx: &mut ExecutionContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let text: Vec<char> = args::string(&args, 0).chars().collect();
    let n = args::integer(&args, 1).max(0) as usize;
    let start = text.len().saturating_sub(n);
    Ok(Value::String(text[start..].iter().collect()))
}

fn split(_ctx: &mut ExecutionContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let text = args::string(&args, 0);
    let delim = args::string(&args, 1);
    let parts: Vec<Json> = if delim.is_empty() {
        vec![Json::String(text)]
    } else {
        text.split(delim.as_str())
            .map(|p| Json::String(p.to_string()))
            .collect()
    };
    Ok(Value::Json(Json::Array(parts)))
}

fn join(_ctx: &mut ExecutionContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let delim = args::string(&args, 1);
    match args.first() {
        Some(Value::Json(Json::Array(elements))) => {
            let parts: Vec<String> = elements
                .iter()
                .map(|e| Value::from_json_shallow(e).as_string())
                .collect();
            Ok(Value::String(parts.join(&delim)))
        }
        Some(other) => Ok(Value::String(other.as_string())),
        None => Ok(Value::String(String::new())),
    }
}

fn replace(_ctx: &mut ExecutionContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let text = args::string(&args, 0);
    let find = args::string(&args, 1);
    if find.is_empty() {
        return Ok(Value::String(text));
    }
    Ok(Value::String(text.replace(&find, &args::string(&args, 2))))
}

fn compile_pattern(pattern: &str) -> Result<Regex, RuntimeError> {
    Regex::new(pattern)
        .map_err(|e| RuntimeError::new(format!("invalid regular expression: {}", e)))
}

fn check_regex_budget(started: Instant, ctx: &ExecutionContext) -> Result<(), RuntimeError> {
    let budget = ctx.options().regex_timeout_ms;
    if budget > 0 && started.elapsed().as_millis() as u64 > budget {
        return Err(RuntimeError::new(format!(
            "regex evaluation exceeded the {} ms budget",
            budget
        )));
    }
    Ok(())
}

fn regex_match(ctx: &mut ExecutionContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let text = args::string(&args, 0);
    let pattern = compile_pattern(&args::string(&args, 1))?;
    let started = Instant::now();
    let matched = pattern.is_match(&text);
    check_regex_budget(started, ctx)?;
    Ok(Value::Boolean(matched))
}

fn regex_replace(ctx: &mut ExecutionContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let text = args::string(&args, 0);
    let pattern = compile_pattern(&args::string(&args, 1))?;
    let replacement = args::string(&args, 2);
    let started = Instant::now();
    let result = pattern.replace_all(&text, replacement.as_str()).to_string();
    check_regex_budget(started, ctx)?;
    Ok(Value::String(result))
}

fn concat(_ctx: &mut ExecutionContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let mut result = String::new();
    for arg in &args {
        result.push_str(&arg.as_string());
    }
    Ok(Value::String(result))
}

/// Character count for strings, element count for arrays, entry count for
/// objects, zero for everything else.
fn length(_ctx: &mut ExecutionContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let n = match args.first() {
        Some(Value::String(s)) => s.chars().count(),
        Some(Value::Json(Json::String(s))) => s.chars().count(),
        Some(Value::Json(Json::Array(a))) => a.len(),
        Some(Value::Json(Json::Object(m))) => m.len(),
        _ => 0,
    };
    Ok(Value::Number(n.into()))
}

pub(super) fn builtins() -> Vec<(&'static str, FunctionEntry)> {
    vec![
        ("trim", super::value_fn(1, Some(1), trim)),
        ("lower", super::value_fn(1, Some(1), lower)),
        ("upper", super::value_fn(1, Some(1), upper)),
        ("substr", super::value_fn(2, Some(3), substr)),
        ("left", super::value_fn(2, Some(2), left)),
        ("right", super::value_fn(2, Some(2), right)),
        ("split", super::value_fn(2, Some(2), split)),
        ("join", super::value_fn(2, Some(2), join)),
        ("replace", super::value_fn(3, Some(3), replace)),
        ("regexMatch", super::value_fn(2, Some(2), regex_match)),
        ("regexReplace", super::value_fn(3, Some(3), regex_replace)),
        ("concat", super::value_fn(0, None, concat)),
        ("length", super::value_fn(1, Some(1), length)),
    ]
}
