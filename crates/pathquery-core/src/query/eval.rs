//! Value comparison helpers shared by predicate evaluation and sorting.

use pathquery_proto::Value;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::Chars;

/// Check if two non-null values are equal.
///
/// Integer widths compare by value, as do integers against floats.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Json(a), Value::Json(b)) => a == b,
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        _ => compare_values(a, b) == Some(Ordering::Equal),
    }
}

/// Compare two values, returning their ordering if comparable.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Int32(a), Value::Int32(b)) => Some(a.cmp(b)),
        (Value::Int64(a), Value::Int64(b)) => Some(a.cmp(b)),
        (Value::Int32(a), Value::Int64(b)) => Some((*a as i64).cmp(b)),
        (Value::Int64(a), Value::Int32(b)) => Some(a.cmp(&(*b as i64))),
        (a, b) if a.is_numeric() && b.is_numeric() => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
        (Value::Bytes(a), Value::Bytes(b)) => Some(a.cmp(b)),
        (Value::Uuid(a), Value::Uuid(b)) => Some(a.cmp(b)),
        // Scalars pulled out of a document compare as their natural type.
        (Value::Json(doc), other) | (other, Value::Json(doc))
            if !doc.is_object() && !doc.is_array() =>
        {
            let inner = Value::from_json(doc);
            if matches!(a, Value::Json(_)) {
                compare_values(&inner, other)
            } else {
                compare_values(other, &inner)
            }
        }
        _ => None, // Incompatible types
    }
}

/// Total ordering for ORDER BY.
///
/// Nulls sort first. Document scalars sort as their natural type. Values of
/// different kinds order by kind: booleans, numbers, strings, timestamps,
/// UUIDs, bytes, arrays, then documents.
pub fn sort_order(a: &Value, b: &Value) -> Ordering {
    let (a, b) = (natural(a), natural(b));
    match (&*a, &*b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (a, b) => kind_rank(a)
            .cmp(&kind_rank(b))
            .then_with(|| compare_values(a, b).unwrap_or_else(|| same_kind_order(a, b))),
    }
}

fn natural(value: &Value) -> Cow<'_, Value> {
    match value {
        Value::Json(doc) if !doc.is_object() && !doc.is_array() => {
            Cow::Owned(Value::from_json(doc))
        }
        other => Cow::Borrowed(other),
    }
}

fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Int32(_) | Value::Int64(_) | Value::Float32(_) | Value::Float64(_) => 2,
        Value::String(_) => 3,
        Value::Timestamp(_) => 4,
        Value::Uuid(_) => 5,
        Value::Bytes(_) => 6,
        Value::Array(_) => 7,
        Value::Json(_) => 8,
    }
}

/// Order for same-kind values `compare_values` leaves unordered: NaN,
/// arrays and documents.
fn same_kind_order(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Array(a), Value::Array(b)) => a
            .iter()
            .zip(b)
            .map(|(x, y)| sort_order(x, y))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| a.len().cmp(&b.len())),
        (Value::Json(a), Value::Json(b)) => a.to_string().cmp(&b.to_string()),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => Ordering::Equal,
        },
    }
}

/// Match a string against a SQL LIKE pattern.
///
/// Supports:
/// - `%` matches zero or more characters
/// - `_` matches exactly one character
/// - `\` makes the next character literal
pub fn like_match(value: &str, pattern: &str) -> bool {
    let mut chars = value.chars().peekable();
    let mut pattern_chars = pattern.chars().peekable();

    like_match_recursive(&mut chars, &mut pattern_chars)
}

fn like_match_recursive(chars: &mut Peekable<Chars>, pattern: &mut Peekable<Chars>) -> bool {
    loop {
        match (pattern.peek().copied(), chars.peek().copied()) {
            (None, None) => return true,
            (None, Some(_)) => return false,
            (Some('%'), _) => {
                pattern.next();
                if pattern.peek().is_none() {
                    return true;
                }

                // Let % absorb 0, 1, 2, ... characters.
                loop {
                    let mut pattern_clone = pattern.clone();
                    let mut chars_clone = chars.clone();
                    if like_match_recursive(&mut chars_clone, &mut pattern_clone) {
                        return true;
                    }
                    if chars.next().is_none() {
                        return false;
                    }
                }
            }
            (Some('_'), Some(_)) => {
                pattern.next();
                chars.next();
            }
            (Some('_'), None) => return false,
            (Some('\\'), _) => {
                pattern.next();
                match (pattern.peek().copied(), chars.peek().copied()) {
                    (Some(p), Some(c)) if p == c => {
                        pattern.next();
                        chars.next();
                    }
                    _ => return false,
                }
            }
            (Some(p), Some(c)) if p == c => {
                pattern.next();
                chars.next();
            }
            (Some(_), _) => return false,
        }
    }
}

/// Escape LIKE metacharacters so `text` matches literally.
pub fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
