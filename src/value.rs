use core::fmt;

use serde_json::{Map, Number};

/// Decoded scalar or structure.
///
/// `Mapping` keeps keys in the order they were read so that a decoded tree can
/// be re-encoded byte-for-byte. Keys are expected to be unique; when a mapping
/// is built by hand with a repeated key, the first occurrence is the one that
/// [`Value::get`] and [`Value::to_json`] see.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Number(Number),
    String(String),
    Sequence(Vec<Value>),
    Mapping(Vec<(String, Value)>),
}

impl Value {
    pub fn string<S: Into<String>>(s: S) -> Self {
        Value::String(s.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// First value stored under `key` when this is a mapping.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Mapping(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Value::Number(n.clone()),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Sequence(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Mapping(entries) => {
                let mut map = Map::with_capacity(entries.len());
                for (key, value) in entries {
                    map.entry(key.as_str()).or_insert_with(|| value.to_json());
                }
                serde_json::Value::Object(map)
            }
        }
    }

    /// Compact JSON text, the form used after the literal marker.
    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Sequence(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Mapping(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            _ => write!(f, "{}", self.to_json_string()),
        }
    }
}

/// Depth-first rewrite of every string leaf.
///
/// Sequence order and mapping key order are preserved; `Null`, `Boolean` and
/// `Number` leaves are returned untouched. The first leaf error aborts the walk.
pub fn walk<F, E>(value: Value, leaf: &mut F) -> Result<Value, E>
where
    F: FnMut(String) -> Result<Value, E>,
{
    match value {
        Value::String(s) => leaf(s),
        Value::Sequence(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(walk(item, leaf)?);
            }
            Ok(Value::Sequence(out))
        }
        Value::Mapping(entries) => {
            let mut out = Vec::with_capacity(entries.len());
            for (key, item) in entries {
                out.push((key, walk(item, leaf)?));
            }
            Ok(Value::Mapping(out))
        }
        leaf_value @ (Value::Null | Value::Boolean(_) | Value::Number(_)) => Ok(leaf_value),
    }
}
