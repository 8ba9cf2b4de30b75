use chrono::{DateTime, FixedOffset};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde_json::Value as Json;
use std::str::FromStr;

/// A runtime scalar used by the evaluator.
///
/// Numbers are arbitrary-precision decimals; whole JSON subtrees travel as
/// [`Value::Json`]. Scalars pulled out of a JSON tree are unwrapped into
/// their native kinds (see [`Value::from_json_shallow`]), so `Json` mostly
/// carries arrays and objects.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Number(Decimal),
    String(String),
    DateTime(DateTime<FixedOffset>),
    Json(Json),
}

impl Value {
    /// Shallow conversion out of a JSON tree: scalars become native kinds,
    /// arrays and objects stay wrapped.
    pub fn from_json_shallow(node: &Json) -> Value {
        match node {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Boolean(*b),
            Json::Number(n) => Value::Number(json_number_to_decimal(n)),
            Json::String(s) => Value::String(s.clone()),
            Json::Array(_) | Json::Object(_) => Value::Json(node.clone()),
        }
    }

    /// Unwrap a scalar JSON payload into its native kind; identity otherwise.
    pub fn normalized(self) -> Value {
        match self {
            Value::Json(node) if !node.is_array() && !node.is_object() => {
                Value::from_json_shallow(&node)
            }
            other => other,
        }
    }

    /// Boolean coercion.
    pub fn as_bool(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => !n.is_zero(),
            Value::String(s) => !s.is_empty(),
            Value::DateTime(_) => true,
            Value::Json(node) => match node {
                Json::Null => false,
                Json::Bool(b) => *b,
                Json::Number(n) => !json_number_to_decimal(n).is_zero(),
                Json::String(s) => !s.is_empty(),
                Json::Array(_) | Json::Object(_) => true,
            },
        }
    }

    /// Numeric coercion. Unparseable strings coerce to zero.
    pub fn as_number(&self) -> Decimal {
        match self {
            Value::Null => Decimal::ZERO,
            Value::Boolean(b) => {
                if *b {
                    Decimal::ONE
                } else {
                    Decimal::ZERO
                }
            }
            Value::Number(n) => *n,
            Value::String(s) => parse_decimal(s),
            Value::DateTime(_) => Decimal::ZERO,
            Value::Json(node) => match node {
                Json::Number(n) => json_number_to_decimal(n),
                Json::String(s) => parse_decimal(s),
                Json::Bool(true) => Decimal::ONE,
                _ => Decimal::ZERO,
            },
        }
    }

    /// String coercion. Nulls become the empty string; datetimes render as
    /// ISO-8601 with offset; JSON composites render as compact JSON text.
    pub fn as_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Boolean(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.clone(),
            Value::DateTime(dt) => dt.to_rfc3339(),
            Value::Json(node) => match node {
                Json::Null => String::new(),
                Json::Bool(b) => b.to_string(),
                Json::Number(n) => n.to_string(),
                Json::String(s) => s.clone(),
                other => serde_json::to_string(other).unwrap_or_default(),
            },
        }
    }

    /// Datetime coercion: datetimes pass through, strings are parsed.
    pub fn as_datetime(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            Value::DateTime(dt) => Some(*dt),
            Value::String(s) => parse_datetime(s),
            Value::Json(Json::String(s)) => parse_datetime(s),
            _ => None,
        }
    }

    /// Convert into a JSON node for storage in `$out`.
    pub fn to_json(&self) -> Json {
        match self {
            Value::Null => Json::Null,
            Value::Boolean(b) => Json::Bool(*b),
            Value::Number(n) => decimal_to_json(*n),
            Value::String(s) => Json::String(s.clone()),
            Value::DateTime(dt) => Json::String(dt.to_rfc3339()),
            Value::Json(node) => node.clone(),
        }
    }

    pub fn is_null_like(&self) -> bool {
        matches!(self, Value::Null | Value::Json(Json::Null))
    }

    /// Language equality: scalar JSON payloads are unwrapped first, equal
    /// kinds compare structurally, mixed kinds compare as strings, and a
    /// lone null never equals a non-null.
    pub fn loose_eq(&self, other: &Value) -> bool {
        let a = self.clone().normalized();
        let b = other.clone().normalized();
        match (a.is_null_like(), b.is_null_like()) {
            (true, true) => return true,
            (true, false) | (false, true) => return false,
            _ => {}
        }
        match (&a, &b) {
            (Value::Boolean(x), Value::Boolean(y)) => x == y,
            (Value::Number(x), Value::Number(y)) => x == y,
            (Value::String(x), Value::String(y)) => x == y,
            (Value::DateTime(x), Value::DateTime(y)) => x == y,
            (Value::Json(x), Value::Json(y)) => x == y,
            _ => a.as_string() == b.as_string(),
        }
    }

    /// Name used by `typeOf` and in diagnostics.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::DateTime(_) => "datetime",
            Value::Json(node) => match node {
                Json::Null => "null",
                Json::Bool(_) => "boolean",
                Json::Number(_) => "number",
                Json::String(_) => "string",
                Json::Array(_) => "array",
                Json::Object(_) => "object",
            },
        }
    }

    /// Empty means null, empty string, empty array, or empty object.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::Json(node) => match node {
                Json::Null => true,
                Json::String(s) => s.is_empty(),
                Json::Array(arr) => arr.is_empty(),
                Json::Object(map) => map.is_empty(),
                _ => false,
            },
            _ => false,
        }
    }
}

/// Invariant-locale decimal parse; scientific notation accepted.
pub fn parse_decimal(s: &str) -> Decimal {
    let trimmed = s.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .unwrap_or(Decimal::ZERO)
}

/// Datetime parse: RFC 3339 first, then common offset-less forms read as UTC.
pub fn parse_datetime(s: &str) -> Option<DateTime<FixedOffset>> {
    let trimmed = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt);
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d"] {
        if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(naive.and_utc().fixed_offset());
        }
        if let Ok(date) = chrono::NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(date.and_hms_opt(0, 0, 0)?.and_utc().fixed_offset());
        }
    }
    None
}

pub fn json_number_to_decimal(n: &serde_json::Number) -> Decimal {
    if let Some(i) = n.as_i64() {
        return Decimal::from(i);
    }
    if let Some(u) = n.as_u64() {
        return Decimal::from(u);
    }
    Decimal::from_str(&n.to_string())
        .ok()
        .or_else(|| n.as_f64().and_then(Decimal::from_f64))
        .unwrap_or(Decimal::ZERO)
}

/// Decimal to JSON number: whole values in i64 range become integers,
/// everything else goes through f64.
pub fn decimal_to_json(d: Decimal) -> Json {
    if d.is_integer() {
        if let Some(i) = d.to_i64() {
            return Json::Number(i.into());
        }
    }
    match d.to_f64().and_then(serde_json::Number::from_f64) {
        Some(n) => Json::Number(n),
        None => Json::Null,
    }
}
