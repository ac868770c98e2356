use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Untyped value carried by request parameters and result returns.
///
/// Serialized untagged, so the wire form is a plain JSON (or `MsgPack`) value:
/// `null`, `true`, `1.5`, `"text"`, `[..]`, `{..}`. Every JSON number is
/// carried as `f64`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// JSON null.
    Null,
    /// JSON boolean.
    Bool(bool),
    /// JSON number (64-bit IEEE 754).
    Number(f64),
    /// JSON string (UTF-8).
    Text(String),
    /// JSON array. Element kinds are not checked until coercion.
    Array(Vec<Value>),
    /// JSON object. Uses `BTreeMap` for deterministic serialization order.
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Concrete type of this value as seen by parameter matching.
    ///
    /// Arrays report [`TypeTag::List`]; typed array tags only appear after
    /// coercion has normalized a homogeneous array.
    #[must_use]
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Self::Null => TypeTag::Null,
            Self::Bool(_) => TypeTag::Bool,
            Self::Number(_) => TypeTag::Number,
            Self::Text(_) => TypeTag::Text,
            Self::Array(_) => TypeTag::List,
            Self::Map(_) => TypeTag::Map,
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
            Self::Array(_) | Self::Map(_) => {
                let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Self::Array(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(value: BTreeMap<String, Value>) -> Self {
        Self::Map(value)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Self::Null, Self::Number),
            serde_json::Value::String(s) => Self::Text(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(fields) => Self::Map(
                fields
                    .into_iter()
                    .map(|(key, value)| (key, Self::from(value)))
                    .collect(),
            ),
        }
    }
}

/// Closed set of concrete types a parameter can declare or an argument can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    /// The reserved per-request [`Context`](crate::Context) parameter.
    Context,
    Null,
    Bool,
    Number,
    Text,
    TextArray,
    BoolArray,
    NumberArray,
    /// Untyped array. Only an empty array keeps this tag after coercion.
    List,
    Map,
}

impl TypeTag {
    /// Rust-facing name used in caller diagnostics.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Context => "Context",
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Number => "f64",
            Self::Text => "String",
            Self::TextArray => "Vec<String>",
            Self::BoolArray => "Vec<bool>",
            Self::NumberArray => "Vec<f64>",
            Self::List => "Vec<Value>",
            Self::Map => "BTreeMap<String, Value>",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_plain_json_values() {
        let value: Value = serde_json::from_str(r#"[null, true, 3, "hi", {"k": [1.5]}]"#).unwrap();
        let mut inner = BTreeMap::new();
        inner.insert("k".to_string(), Value::Array(vec![Value::Number(1.5)]));
        assert_eq!(
            value,
            Value::Array(vec![
                Value::Null,
                Value::Bool(true),
                Value::Number(3.0),
                Value::Text("hi".to_string()),
                Value::Map(inner),
            ])
        );
    }

    #[test]
    fn serializes_without_variant_tags() {
        let value = Value::Array(vec![Value::Null, Value::Text("x".into()), Value::Number(2.0)]);
        assert_eq!(serde_json::to_string(&value).unwrap(), r#"[null,"x",2.0]"#);
    }

    #[test]
    fn type_tag_of_raw_array_is_list() {
        assert_eq!(Value::Array(vec![]).type_tag(), TypeTag::List);
        assert_eq!(Value::Text(String::new()).type_tag(), TypeTag::Text);
        assert_eq!(Value::Null.type_tag(), TypeTag::Null);
    }

    #[test]
    fn display_renders_text_raw_and_composites_as_json() {
        assert_eq!(Value::Text("bob".into()).to_string(), "bob");
        assert_eq!(Value::Number(1.0).to_string(), "1");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(
            Value::Array(vec![Value::Bool(true), Value::Null]).to_string(),
            "[true,null]"
        );
    }

    #[test]
    fn converts_from_serde_json() {
        let value = Value::from(serde_json::json!({"session": "s1", "n": 2}));
        let Value::Map(fields) = value else {
            panic!("expected a map");
        };
        assert_eq!(fields["session"], Value::Text("s1".into()));
        assert_eq!(fields["n"], Value::Number(2.0));
    }

    #[test]
    fn option_none_converts_to_null() {
        assert_eq!(Value::from(None::<String>), Value::Null);
        assert_eq!(Value::from(Some("a")), Value::Text("a".into()));
    }
}
