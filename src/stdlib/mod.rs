//! The standard library: built-in functions registered at engine creation.
//!
//! Each submodule contributes a list of `(name, entry)` pairs for one
//! category; [`builtins`] flattens them into the case-insensitive map the
//! engine registry starts from.

use crate::context::ExecutionContext;
use crate::engine::{FunctionEntry, FunctionKind};
use crate::error::RuntimeError;
use crate::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

mod array;
mod date;
mod expand;
mod jsonpath;
mod math;
mod output;
mod string;
mod type_ops;

type BuiltinFn = fn(&mut ExecutionContext, Vec<Value>) -> Result<Value, RuntimeError>;

pub(crate) fn value_fn(min: usize, max: Option<usize>, func: BuiltinFn) -> FunctionEntry {
    FunctionEntry {
        kind: FunctionKind::Value,
        min_args: min,
        max_args: max,
        func: Arc::new(func),
    }
}

pub(crate) fn mutating_fn(min: usize, max: Option<usize>, func: BuiltinFn) -> FunctionEntry {
    FunctionEntry {
        kind: FunctionKind::MutatesFirstArg,
        min_args: min,
        max_args: max,
        func: Arc::new(func),
    }
}

/// Build the full standard library, keyed by lowercased name.
pub fn builtins() -> HashMap<String, FunctionEntry> {
    let mut map = HashMap::new();
    for (name, entry) in jsonpath::builtins()
        .into_iter()
        .chain(string::builtins())
        .chain(math::builtins())
        .chain(date::builtins())
        .chain(type_ops::builtins())
        .chain(array::builtins())
        .chain(output::builtins())
        .chain(expand::builtins())
    {
        map.insert(name.to_lowercase(), entry);
    }
    map
}

/// Shared argument helpers.
pub(crate) mod args {
    use super::*;
    use serde_json::Value as Json;

    pub fn string(args: &[Value], idx: usize) -> String {
        args.get(idx).map(|v| v.as_string()).unwrap_or_default()
    }

    pub fn number(args: &[Value], idx: usize) -> rust_decimal::Decimal {
        args.get(idx)
            .map(|v| v.as_number())
            .unwrap_or(rust_decimal::Decimal::ZERO)
    }

    pub fn json(args: &[Value], idx: usize) -> Json {
        args.get(idx).map(|v| v.to_json()).unwrap_or(Json::Null)
    }

    pub fn integer(args: &[Value], idx: usize) -> i64 {
        use rust_decimal::prelude::ToPrimitive;
        number(args, idx).trunc().to_i64().unwrap_or(0)
    }
}
