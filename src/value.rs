//! Typed YQL values
//!
//! This module provides the value tree bound to `DECLARE`d query parameters.
//! Every value knows its YDB type, and the type's `Display` output is exactly
//! what goes into a `DECLARE $name AS <type>` clause.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::{json, Map, Value as JsonValue};

use crate::error::{Error, Result};

/// YDB data types used by the binding
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum YdbType {
    /// UTF-8 text (`Text` in DDL)
    Utf8,
    /// Arbitrary bytes (`Bytes` in DDL)
    String,
    /// Unsigned 64-bit integer
    Uint64,
    /// Nullable wrapper
    Optional(Box<YdbType>),
    /// Homogeneous list
    List(Box<YdbType>),
    /// Named members, in declaration order
    Struct(Vec<(String, YdbType)>),
}

impl YdbType {
    /// Wrap the type in `Optional<..>`
    pub fn optional(self) -> Self {
        YdbType::Optional(Box::new(self))
    }

    /// Wrap the type in `List<..>`
    pub fn list(self) -> Self {
        YdbType::List(Box::new(self))
    }
}

impl fmt::Display for YdbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YdbType::Utf8 => f.write_str("Utf8"),
            YdbType::String => f.write_str("String"),
            YdbType::Uint64 => f.write_str("Uint64"),
            YdbType::Optional(inner) => write!(f, "Optional<{}>", inner),
            YdbType::List(inner) => write!(f, "List<{}>", inner),
            YdbType::Struct(members) => {
                f.write_str("Struct<")?;
                for (i, (name, ty)) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}:{}", name, ty)?;
                }
                f.write_str(">")
            }
        }
    }
}

/// A typed value that can be bound to a query parameter
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// UTF-8 text
    Text(String),
    /// Binary data
    Bytes(Vec<u8>),
    /// Unsigned integer
    Uint64(u64),
    /// Nullable value; `item_type` is kept so `NULL` still has a type
    Optional {
        item_type: YdbType,
        value: Option<Box<Value>>,
    },
    /// List of values sharing `item_type`
    List {
        item_type: YdbType,
        items: Vec<Value>,
    },
    /// Struct with named members
    Struct(Vec<(String, Value)>),
}

impl Value {
    /// Build a text value
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    /// Build a bytes value
    pub fn bytes(b: impl Into<Vec<u8>>) -> Self {
        Value::Bytes(b.into())
    }

    /// Build an unsigned integer value
    pub fn uint64(v: u64) -> Self {
        Value::Uint64(v)
    }

    /// Build an `Optional<String>` value, `NULL` when `b` is `None`
    pub fn nullable_bytes(b: Option<Vec<u8>>) -> Self {
        Value::Optional {
            item_type: YdbType::String,
            value: b.map(|b| Box::new(Value::Bytes(b))),
        }
    }

    /// Build a list with an explicit item type
    ///
    /// Every item must have `item_type`.
    pub fn list(item_type: YdbType, items: Vec<Value>) -> Result<Self> {
        if let Some(bad) = items.iter().find(|v| v.ydb_type() != item_type) {
            return Err(Error::value(format!(
                "list item of type {} does not match List<{}>",
                bad.ydb_type(),
                item_type
            )));
        }
        Ok(Value::List { item_type, items })
    }

    /// Build a list, taking the item type from the first item
    pub fn list_from(items: Vec<Value>) -> Result<Self> {
        let item_type = items
            .first()
            .map(Value::ydb_type)
            .ok_or_else(|| Error::value("cannot infer the item type of an empty list"))?;
        Self::list(item_type, items)
    }

    /// Build a struct from named members
    pub fn struct_value(fields: Vec<(String, Value)>) -> Self {
        Value::Struct(fields)
    }

    /// The YDB type of this value
    pub fn ydb_type(&self) -> YdbType {
        match self {
            Value::Text(_) => YdbType::Utf8,
            Value::Bytes(_) => YdbType::String,
            Value::Uint64(_) => YdbType::Uint64,
            Value::Optional { item_type, .. } => item_type.clone().optional(),
            Value::List { item_type, .. } => item_type.clone().list(),
            Value::Struct(fields) => YdbType::Struct(
                fields
                    .iter()
                    .map(|(name, v)| (name.clone(), v.ydb_type()))
                    .collect(),
            ),
        }
    }

    /// Encode the bare value as JSON; bytes are base64 encoded
    pub fn to_json_value(&self) -> JsonValue {
        match self {
            Value::Text(s) => JsonValue::String(s.clone()),
            Value::Bytes(b) => JsonValue::String(STANDARD.encode(b)),
            Value::Uint64(v) => JsonValue::Number((*v).into()),
            Value::Optional { value, .. } => value
                .as_ref()
                .map(|v| v.to_json_value())
                .unwrap_or(JsonValue::Null),
            Value::List { items, .. } => {
                JsonValue::Array(items.iter().map(Value::to_json_value).collect())
            }
            Value::Struct(fields) => {
                let mut obj = Map::with_capacity(fields.len());
                for (name, v) in fields {
                    obj.insert(name.clone(), v.to_json_value());
                }
                JsonValue::Object(obj)
            }
        }
    }

    /// Encode the value together with its type name
    pub fn to_typed_json(&self) -> JsonValue {
        json!({
            "type": self.ydb_type().to_string(),
            "value": self.to_json_value(),
        })
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Uint64(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::List {
            item_type: YdbType::Utf8,
            items: v.into_iter().map(Value::Text).collect(),
        }
    }
}

impl From<Option<Vec<u8>>> for Value {
    fn from(v: Option<Vec<u8>>) -> Self {
        Value::nullable_bytes(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_type_names() {
        assert_eq!(Value::text("k").ydb_type().to_string(), "Utf8");
        assert_eq!(Value::bytes(vec![1u8]).ydb_type().to_string(), "String");
        assert_eq!(Value::uint64(5).ydb_type().to_string(), "Uint64");
    }

    #[test]
    fn test_nullable_bytes_type() {
        let v = Value::nullable_bytes(None);
        assert_eq!(v.ydb_type().to_string(), "Optional<String>");
        assert_eq!(v.to_json_value(), JsonValue::Null);
    }

    #[test]
    fn test_struct_list_type_name() {
        let row = Value::struct_value(vec![
            ("key".to_string(), Value::text("")),
            ("value".to_string(), Value::uint64(0)),
        ]);
        let list = Value::list_from(vec![row]).unwrap();
        assert_eq!(
            list.ydb_type().to_string(),
            "List<Struct<key:Utf8,value:Uint64>>"
        );
    }

    #[test]
    fn test_keys_list() {
        let keys: Value = vec!["a".to_string(), "b".to_string()].into();
        assert_eq!(keys.ydb_type().to_string(), "List<Utf8>");
        assert_eq!(keys.to_json_value(), json!(["a", "b"]));
    }

    #[test]
    fn test_empty_list_keeps_item_type() {
        let keys: Value = Vec::<String>::new().into();
        assert_eq!(keys.ydb_type().to_string(), "List<Utf8>");
    }

    #[test]
    fn test_list_from_empty_is_error() {
        assert!(Value::list_from(vec![]).is_err());
    }

    #[test]
    fn test_list_rejects_mixed_items() {
        let result = Value::list(YdbType::Utf8, vec![Value::text("a"), Value::uint64(1)]);
        assert!(matches!(result, Err(Error::Value { .. })));
    }

    #[test]
    fn test_bytes_json_is_base64() {
        assert_eq!(Value::bytes(b"hello".to_vec()).to_json_value(), json!("aGVsbG8="));
    }

    #[test]
    fn test_typed_json() {
        let v = Value::nullable_bytes(Some(b"ab".to_vec()));
        assert_eq!(
            v.to_typed_json(),
            json!({"type": "Optional<String>", "value": "YWI="})
        );
    }

    #[test]
    fn test_struct_json() {
        let row = Value::struct_value(vec![
            ("YCSB_KEY".to_string(), Value::text("user1")),
            ("FIELD0".to_string(), Value::nullable_bytes(None)),
        ]);
        assert_eq!(
            row.to_json_value(),
            json!({"YCSB_KEY": "user1", "FIELD0": null})
        );
    }
}
