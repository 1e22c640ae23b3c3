//! Culture-aware primitive conversion
//!
//! Pass-through to standard numeric/boolean/string conversions between JSON
//! primitive values, with one refinement: when a numeric target fails to
//! parse from a string, a locale-aware decimal reparse (strip the group
//! separator, map the decimal separator to '.') is attempted before the
//! error propagates.
//!
//! Copyright (c) 2025 Remold Team
//! Licensed under the Apache-2.0 license

use crate::context::Culture;
use crate::error::{Error, Result};
use crate::types::TypeName;
use serde_json::{Number, Value};

/// Convert `value` to the primitive type named by `target`.
///
/// Supported targets are the catalog's standard primitives: `bool`, `i64`,
/// `u64`, `f64` and `String`. Null inputs are not handled here; null-source
/// policy runs before conversion.
pub fn convert_primitive(value: &Value, target: &TypeName, culture: &Culture) -> Result<Value> {
    match target.as_str() {
        "String" => to_string_value(value, target),
        "bool" => to_bool(value, target),
        "i64" => to_i64(value, culture, target).map(Value::from),
        "u64" => to_u64(value, culture, target).map(Value::from),
        "f64" => to_f64(value, culture, target).and_then(|f| {
            Number::from_f64(f)
                .map(Value::Number)
                .ok_or_else(|| conversion_error(value, target))
        }),
        _ => Err(conversion_error(value, target)),
    }
}

fn to_string_value(value: &Value, target: &TypeName) -> Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(s.clone())),
        Value::Number(n) => Ok(Value::String(n.to_string())),
        Value::Bool(b) => Ok(Value::String(b.to_string())),
        _ => Err(conversion_error(value, target)),
    }
}

fn to_bool(value: &Value, target: &TypeName) -> Result<Value> {
    match value {
        Value::Bool(b) => Ok(Value::Bool(*b)),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(conversion_error(value, target)),
        },
        Value::Number(n) => Ok(Value::Bool(n.as_f64().map(|f| f != 0.0).unwrap_or(false))),
        _ => Err(conversion_error(value, target)),
    }
}

fn to_i64(value: &Value, culture: &Culture, target: &TypeName) -> Result<i64> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
                    Ok(f as i64)
                }
                _ => Err(conversion_error(value, target)),
            }
        }
        Value::String(s) => parse_with_fallback::<i64>(s, culture)
            .ok_or_else(|| conversion_error(value, target)),
        Value::Bool(b) => Ok(i64::from(*b)),
        _ => Err(conversion_error(value, target)),
    }
}

fn to_u64(value: &Value, culture: &Culture, target: &TypeName) -> Result<u64> {
    match value {
        Value::Number(n) => n.as_u64().ok_or_else(|| conversion_error(value, target)),
        Value::String(s) => parse_with_fallback::<u64>(s, culture)
            .ok_or_else(|| conversion_error(value, target)),
        Value::Bool(b) => Ok(u64::from(*b)),
        _ => Err(conversion_error(value, target)),
    }
}

fn to_f64(value: &Value, culture: &Culture, target: &TypeName) -> Result<f64> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| conversion_error(value, target)),
        Value::String(s) => parse_with_fallback::<f64>(s, culture)
            .ok_or_else(|| conversion_error(value, target)),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        _ => Err(conversion_error(value, target)),
    }
}

/// Standard parse first; on failure, reparse under the supplied culture's
/// separators before giving up
fn parse_with_fallback<T: std::str::FromStr>(s: &str, culture: &Culture) -> Option<T> {
    let trimmed = s.trim();
    if let Ok(v) = trimmed.parse::<T>() {
        return Some(v);
    }
    normalize_decimal(trimmed, culture).parse::<T>().ok()
}

fn normalize_decimal(s: &str, culture: &Culture) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if Some(c) == culture.group_separator {
            continue;
        }
        if c == culture.decimal_separator {
            out.push('.');
        } else {
            out.push(c);
        }
    }
    out
}

fn conversion_error(value: &Value, target: &TypeName) -> Error {
    Error::Conversion {
        value: value.to_string(),
        target_type: target.to_string(),
        source: None,
    }
}
