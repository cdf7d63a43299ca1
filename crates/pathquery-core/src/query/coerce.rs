//! Literal coercion to declared field types.
//!
//! Predicate literals arrive loosely typed (often as strings from a form or
//! URL). Before compiling a comparison the literal is converted to the type
//! of the field it is compared with.

use crate::catalog::{FieldType, ScalarType};
use crate::error::Error;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use pathquery_proto::Value;

/// Date-time layouts tried in order for string-to-timestamp coercion.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S",
];

/// Date-only layouts, interpreted as midnight UTC.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// Convert `value` to the type declared by `target`.
///
/// Null stays null. For array fields the element type is used, so a single
/// literal can be tested for membership.
pub fn coerce(value: &Value, target: &FieldType) -> Result<Value, Error> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    if let Some(variants) = target.enum_variants() {
        return coerce_enum(value, variants, target);
    }

    match (value, target) {
        (Value::Array(items), FieldType::ArrayScalar(scalar)) => items
            .iter()
            .map(|item| coerce_scalar(item, scalar))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        (_, FieldType::Scalar(scalar))
        | (_, FieldType::OptionalScalar(scalar))
        | (_, FieldType::ArrayScalar(scalar)) => coerce_scalar(value, scalar),
        _ => Err(Error::coercion(value, target)),
    }
}

fn coerce_enum(value: &Value, variants: &[String], target: &FieldType) -> Result<Value, Error> {
    match value.to_text() {
        Some(text) if text.is_empty() => Ok(Value::Null),
        Some(text) if variants.iter().any(|v| *v == text) => Ok(Value::String(text)),
        _ => Err(Error::coercion(value, target)),
    }
}

/// Convert to a scalar type.
pub fn coerce_scalar(value: &Value, target: &ScalarType) -> Result<Value, Error> {
    if let Value::String(s) = value {
        if s.is_empty() && *target != ScalarType::String {
            return Ok(Value::Null);
        }
    }

    let converted = match target {
        ScalarType::Bool => to_bool(value),
        ScalarType::Int32 => to_integer(value).and_then(|i| i32::try_from(i).ok().map(Value::Int32)),
        ScalarType::Int64 => to_integer(value).map(Value::Int64),
        ScalarType::Float32 => to_float(value).map(|f| Value::Float32(f as f32)),
        ScalarType::Float64 => to_float(value).map(Value::Float64),
        ScalarType::String => value.to_text().map(Value::String),
        ScalarType::Bytes => match value {
            Value::Bytes(b) => Some(Value::Bytes(b.clone())),
            Value::String(s) => Some(Value::Bytes(s.as_bytes().to_vec())),
            _ => None,
        },
        ScalarType::Timestamp => to_timestamp(value).map(Value::Timestamp),
        ScalarType::Uuid => to_uuid(value).map(Value::Uuid),
        // Document values are compared as they come.
        ScalarType::Json => Some(value.clone()),
    };

    converted.ok_or_else(|| Error::coercion(value, target))
}

fn to_bool(value: &Value) -> Option<Value> {
    match value {
        Value::Bool(b) => Some(Value::Bool(*b)),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        other => match other.as_i64() {
            Some(0) => Some(Value::Bool(false)),
            Some(1) => Some(Value::Bool(true)),
            _ => None,
        },
    }
}

/// Integer value, truncating fractions the way a decimal parse then cast does.
fn to_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Int32(i) => Some(*i as i64),
        Value::Int64(i) => Some(*i),
        Value::Float32(_) | Value::Float64(_) => value.as_f64().and_then(truncate),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(truncate))
        }
        _ => None,
    }
}

fn truncate(f: f64) -> Option<i64> {
    if f.is_finite() && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f.trunc() as i64)
    } else {
        None
    }
}

fn to_float(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.trim().parse::<f64>().ok(),
        other => other.as_f64(),
    }
}

/// Timestamp in microseconds.
///
/// Integers are epoch milliseconds. Strings are tried against the known
/// layouts, then as epoch milliseconds.
fn to_timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::Timestamp(t) => Some(*t),
        Value::Int32(_) | Value::Int64(_) => value.as_i64().and_then(|ms| ms.checked_mul(1000)),
        Value::String(s) => parse_timestamp(s.trim()),
        _ => None,
    }
}

fn parse_timestamp(s: &str) -> Option<i64> {
    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&naive).timestamp_micros());
        }
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(s) {
        return Some(parsed.timestamp_micros());
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            let midnight = date.and_hms_opt(0, 0, 0)?;
            return Some(Utc.from_utc_datetime(&midnight).timestamp_micros());
        }
    }
    s.parse::<i64>().ok().and_then(|ms| ms.checked_mul(1000))
}

fn to_uuid(value: &Value) -> Option<[u8; 16]> {
    match value {
        Value::Uuid(u) => Some(*u),
        Value::String(s) => uuid::Uuid::parse_str(s.trim()).ok().map(|u| *u.as_bytes()),
        Value::Bytes(b) => b.as_slice().try_into().ok(),
        _ => None,
    }
}
