//! Date built-ins. Datetimes carry an offset; `"o"` is the round-trip
//! RFC 3339 format, anything else is a chrono strftime pattern.

use super::args;
use crate::context::ExecutionContext;
use crate::engine::FunctionEntry;
use crate::error::RuntimeError;
use crate::value::{parse_datetime, Value};
use chrono::{DateTime, Duration, FixedOffset, Months, Utc};
use rust_decimal::Decimal;
use std::fmt::Write;

fn now(_ctx: &mut ExecutionContext, _args: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(Value::DateTime(Utc::now().fixed_offset()))
}

fn parse_date(_ctx: &mut ExecutionContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let text = args::string(&args, 0);
    let parsed = match args.get(1) {
        None => parse_datetime(&text),
        Some(fmt) => parse_with_format(&text, &fmt.as_string()),
    };
    Ok(parsed.map(Value::DateTime).unwrap_or(Value::Null))
}

fn parse_with_format(text: &str, fmt: &str) -> Option<DateTime<FixedOffset>> {
    if fmt == "o" {
        return DateTime::parse_from_rfc3339(text.trim()).ok();
    }
    if let Ok(dt) = DateTime::parse_from_str(text.trim(), fmt) {
        return Some(dt);
    }
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(text.trim(), fmt) {
        return Some(naive.and_utc().fixed_offset());
    }
    if let Ok(date) = chrono::NaiveDate::parse_from_str(text.trim(), fmt) {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc().fixed_offset());
    }
    None
}

fn required_datetime(args: &[Value], idx: usize) -> Result<DateTime<FixedOffset>, RuntimeError> {
    args.get(idx)
        .and_then(|v| v.as_datetime())
        .ok_or_else(|| RuntimeError::new("argument is not a datetime"))
}

fn format_date(_ctx: &mut ExecutionContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let dt = required_datetime(&args, 0)?;
    let fmt = args::string(&args, 1);
    if fmt == "o" {
        return Ok(Value::String(dt.to_rfc3339()));
    }
    let mut result = String::new();
    write!(result, "{}", dt.format(&fmt))
        .map_err(|_| RuntimeError::new(format!("invalid date format '{}'", fmt)))?;
    Ok(Value::String(result))
}

fn date_add(_ctx: &mut ExecutionContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let dt = required_datetime(&args, 0)?;
    let unit = args::string(&args, 1).to_lowercase();
    let amount = args::integer(&args, 2);

    let result = match unit.as_str() {
        "days" => Duration::try_days(amount).and_then(|d| dt.checked_add_signed(d)),
        "hours" => Duration::try_hours(amount).and_then(|d| dt.checked_add_signed(d)),
        "minutes" => Duration::try_minutes(amount).and_then(|d| dt.checked_add_signed(d)),
        "seconds" => Duration::try_seconds(amount).and_then(|d| dt.checked_add_signed(d)),
        "months" => add_months(dt, amount),
        "years" => add_months(dt, amount.saturating_mul(12)),
        other => {
            return Err(RuntimeError::new(format!(
                "unknown date unit '{}' (expected days, hours, minutes, seconds, months, or years)",
                other
            )))
        }
    };
    result
        .map(Value::DateTime)
        .ok_or_else(|| RuntimeError::new("date arithmetic out of range"))
}

fn add_months(dt: DateTime<FixedOffset>, amount: i64) -> Option<DateTime<FixedOffset>> {
    if amount >= 0 {
        dt.checked_add_months(Months::new(u32::try_from(amount).ok()?))
    } else {
        dt.checked_sub_months(Months::new(u32::try_from(-amount).ok()?))
    }
}

/// Signed whole units of `b - a`.
fn date_diff(_ctx: &mut ExecutionContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let a = required_datetime(&args, 0)?;
    let b = required_datetime(&args, 1)?;
    let unit = args::string(&args, 2).to_lowercase();
    let duration = b.signed_duration_since(a);

    let n = match unit.as_str() {
        "days" => duration.num_days(),
        "hours" => duration.num_hours(),
        "minutes" => duration.num_minutes(),
        "seconds" => duration.num_seconds(),
        other => {
            return Err(RuntimeError::new(format!(
                "unknown date unit '{}' (expected days, hours, minutes, or seconds)",
                other
            )))
        }
    };
    Ok(Value::Number(Decimal::from(n)))
}

pub(super) fn builtins() -> Vec<(&'static str, FunctionEntry)> {
    vec![
        ("now", super::value_fn(0, Some(0), now)),
        ("parseDate", super::value_fn(1, Some(2), parse_date)),
        ("formatDate", super::value_fn(2, Some(2), format_date)),
        ("dateAdd", super::value_fn(3, Some(3), date_add)),
        ("dateDiff", super::value_fn(3, Some(3), date_diff)),
    ]
}
