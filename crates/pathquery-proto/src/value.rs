//! Runtime value types for query parameters and results.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A runtime value stored in an entity field, passed as a query operand or
/// returned in a result column.
///
/// Unlike catalog types, arrays and documents are nested values, so the enum
/// is serialized with serde rather than framed for zero-copy access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 32-bit signed integer.
    Int32(i32),
    /// 64-bit signed integer.
    Int64(i64),
    /// 32-bit floating point.
    Float32(f32),
    /// 64-bit floating point.
    Float64(f64),
    /// UTF-8 string.
    String(String),
    /// Binary data.
    Bytes(Vec<u8>),
    /// Timestamp as microseconds since Unix epoch.
    Timestamp(i64),
    /// UUID as 16 bytes.
    Uuid([u8; 16]),
    /// Array of values.
    Array(Vec<Value>),
    /// A JSON document column.
    Json(serde_json::Value),
}

/// Hashable canonical form of a [`Value`].
///
/// Used wherever values act as identities: grouping rows by root entity,
/// DISTINCT projections and join lookups. Integer widths share one key so an
/// `Int32` foreign key matches an `Int64` identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Bool(bool),
    Int(i64),
    Float(u64),
    String(String),
    Bytes(Vec<u8>),
    Timestamp(i64),
    Uuid([u8; 16]),
    Array(Vec<Key>),
    Json(String),
}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this value is an array.
    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Check if this value is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Value::Int32(_) | Value::Int64(_) | Value::Float32(_) | Value::Float64(_)
        )
    }

    /// Try to get as bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as i32.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int32(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get as i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(i) => Some(*i),
            Value::Int32(i) => Some(*i as i64),
            _ => None,
        }
    }

    /// Try to get as f64, widening any numeric value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float64(f) => Some(*f),
            Value::Float32(f) => Some(*f as f64),
            Value::Int32(i) => Some(*i as f64),
            Value::Int64(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to get as string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as bytes reference.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Try to get as timestamp.
    pub fn as_timestamp(&self) -> Option<i64> {
        match self {
            Value::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    /// Try to get as UUID.
    pub fn as_uuid(&self) -> Option<&[u8; 16]> {
        match self {
            Value::Uuid(u) => Some(u),
            _ => None,
        }
    }

    /// Try to get as array slice.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Try to get as JSON document.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Json(doc) => Some(doc),
            _ => None,
        }
    }

    /// Canonical hashable key, or `None` for null.
    pub fn key(&self) -> Option<Key> {
        Some(match self {
            Value::Null => return None,
            Value::Bool(b) => Key::Bool(*b),
            Value::Int32(i) => Key::Int(*i as i64),
            Value::Int64(i) => Key::Int(*i),
            Value::Float32(f) => Key::Float((*f as f64).to_bits()),
            Value::Float64(f) => Key::Float(f.to_bits()),
            Value::String(s) => Key::String(s.clone()),
            Value::Bytes(b) => Key::Bytes(b.clone()),
            Value::Timestamp(t) => Key::Timestamp(*t),
            Value::Uuid(u) => Key::Uuid(*u),
            Value::Array(items) => Key::Array(
                items
                    .iter()
                    .map(|v| v.key().unwrap_or(Key::Json("null".into())))
                    .collect(),
            ),
            Value::Json(doc) => Key::Json(doc.to_string()),
        })
    }

    /// Plain text rendering used for document comparisons and string coercion.
    ///
    /// Returns `None` for null. Strings are returned without quotes.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Json(serde_json::Value::String(s)) => Some(s.clone()),
            Value::Json(serde_json::Value::Null) => None,
            other => Some(other.to_string()),
        }
    }

    /// Convert into a JSON document value.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int32(i) => Json::from(*i),
            Value::Int64(i) => Json::from(*i),
            Value::Float32(f) => Json::from(*f as f64),
            Value::Float64(f) => Json::from(*f),
            Value::String(s) => Json::String(s.clone()),
            Value::Bytes(b) => Json::Array(b.iter().map(|byte| Json::from(*byte)).collect()),
            Value::Timestamp(t) => Json::from(*t),
            Value::Uuid(u) => Json::String(uuid::Uuid::from_bytes(*u).to_string()),
            Value::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Json(doc) => doc.clone(),
        }
    }

    /// Convert a JSON document node into a value.
    ///
    /// Objects stay documents; scalars map onto the closest variant.
    pub fn from_json(doc: &serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match doc {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int64(i),
                None => n.as_f64().map(Value::Float64).unwrap_or(Value::Null),
            },
            Json::String(s) => Value::String(s.clone()),
            Json::Array(_) | Json::Object(_) => Value::Json(doc.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int32(i) => write!(f, "{}", i),
            Value::Int64(i) => write!(f, "{}", i),
            Value::Float32(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "{}", s),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Timestamp(t) => write!(f, "{}", t),
            Value::Uuid(u) => write!(f, "{}", uuid::Uuid::from_bytes(*u)),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Json(doc) => write!(f, "{}", doc),
        }
    }
}

// Conversion implementations
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<[u8; 16]> for Value {
    fn from(v: [u8; 16]) -> Self {
        Value::Uuid(v)
    }
}

impl From<uuid::Uuid> for Value {
    fn from(v: uuid::Uuid) -> Self {
        Value::Uuid(*v.as_bytes())
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_accessors() {
        assert!(Value::Null.is_null());
        assert!(!Value::Bool(true).is_null());

        assert_eq!(Value::Int32(42).as_i64(), Some(42));
        assert_eq!(Value::Int64(7).as_f64(), Some(7.0));
        assert_eq!(Value::String("hello".into()).as_str(), Some("hello"));
        assert!(Value::Array(vec![]).is_array());

        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Int64(7).as_i32(), None);
        assert_eq!(Value::Int32(7).as_i32(), Some(7));
        assert_eq!(Value::Timestamp(1_000).as_timestamp(), Some(1_000));
        assert_eq!(Value::Uuid([1; 16]).as_uuid(), Some(&[1; 16]));
        assert_eq!(
            Value::Array(vec![Value::Int32(1)]).as_array(),
            Some(&[Value::Int32(1)][..])
        );
        assert_eq!(Value::String("x".into()).as_array(), None);
    }

    #[test]
    fn test_key_unifies_integer_widths() {
        assert_eq!(Value::Int32(5).key(), Value::Int64(5).key());
        assert_ne!(Value::Int32(5).key(), Value::Float64(5.0).key());
        assert_eq!(Value::Null.key(), None);
    }

    #[test]
    fn test_text_rendering() {
        assert_eq!(Value::String("a".into()).to_text(), Some("a".to_string()));
        assert_eq!(Value::Int64(12).to_text(), Some("12".to_string()));
        assert_eq!(
            Value::Json(serde_json::json!("red")).to_text(),
            Some("red".to_string())
        );
        assert_eq!(Value::Null.to_text(), None);

        let id = uuid::Uuid::nil();
        assert_eq!(
            Value::from(id).to_text(),
            Some("00000000-0000-0000-0000-000000000000".to_string())
        );
    }

    #[test]
    fn test_json_conversion() {
        let doc = serde_json::json!({"color": "red", "size": 3});
        let value = Value::from_json(&doc);
        assert_eq!(value, Value::Json(doc.clone()));

        assert_eq!(Value::from_json(&serde_json::json!(3)), Value::Int64(3));
        assert_eq!(Value::from_json(&serde_json::json!(1.5)), Value::Float64(1.5));
        assert_eq!(Value::Int32(3).to_json(), serde_json::json!(3));
    }

    #[test]
    fn test_value_conversions() {
        let v: Value = Some(3i64).into();
        assert_eq!(v, Value::Int64(3));

        let v: Value = None::<i64>.into();
        assert_eq!(v, Value::Null);

        let v: Value = vec![Value::Int32(1)].into();
        assert!(v.is_array());
    }
}
