//! Named query parameters
//!
//! Collects the `$name -> value` bindings of a request and derives the
//! `DECLARE` clauses the query text needs for them.

use serde_json::{Map, Value as JsonValue};

use crate::value::Value;

/// Ordered collection of named, typed parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    binds: Vec<(String, Value)>,
}

impl Params {
    /// Create an empty parameter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter; a leading `$` is added to the name if missing
    pub fn bind(mut self, name: &str, value: impl Into<Value>) -> Self {
        let name = if name.starts_with('$') {
            name.to_string()
        } else {
            format!("${}", name)
        };
        self.binds.push((name, value.into()));
        self
    }

    /// Number of bound parameters
    pub fn len(&self) -> usize {
        self.binds.len()
    }

    /// Whether no parameters are bound
    pub fn is_empty(&self) -> bool {
        self.binds.is_empty()
    }

    /// Look up a parameter by name (with or without `$`)
    pub fn get(&self, name: &str) -> Option<&Value> {
        let name = name.trim_start_matches('$');
        self.binds
            .iter()
            .find(|(n, _)| &n[1..] == name)
            .map(|(_, v)| v)
    }

    /// Iterate over `(name, value)` pairs in bind order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.binds.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// `DECLARE $name AS <type>` clauses, sorted
    pub fn declares(&self) -> Vec<String> {
        let mut declares: Vec<String> = self
            .binds
            .iter()
            .map(|(name, value)| format!("DECLARE {} AS {}", name, value.ydb_type()))
            .collect();
        declares.sort();
        declares
    }

    /// Encode as a `{"$name": {"type", "value"}}` object
    pub fn to_json(&self) -> JsonValue {
        let mut obj = Map::with_capacity(self.binds.len());
        for (name, value) in &self.binds {
            obj.insert(name.clone(), value.to_typed_json());
        }
        JsonValue::Object(obj)
    }

    /// Short `name:type` summary for logs; values are left out
    pub fn describe(&self) -> String {
        self.binds
            .iter()
            .map(|(name, value)| format!("{}:{}", name, value.ydb_type()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
