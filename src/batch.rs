//! Row batches for insert and update
//!
//! Harness rows arrive as `key -> {field -> bytes}` maps. YDB wants them as
//! a `List<Struct<..>>` parameter fed through `AS_TABLE($values)`, which
//! requires every struct in the list to have the same members. This module
//! builds that list:
//!
//! - field names are upper-cased to match the table's `FIELDn` columns
//! - columns are sorted so equal shapes render equal `DECLARE` clauses
//! - in a batch, the column set is the union over all rows and a row that
//!   lacks a column binds `NULL` for it
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use ycsb_ydb::batch::RowBatch;
//!
//! let mut batch = RowBatch::new();
//! batch.push("user1", HashMap::from([("field0".to_string(), b"a".to_vec())]));
//! batch.push("user2", HashMap::from([("field1".to_string(), b"b".to_vec())]));
//!
//! assert_eq!(batch.len(), 2);
//! assert_eq!(batch.columns(), vec!["FIELD0".to_string(), "FIELD1".to_string()]);
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::{Error, Result};
use crate::query::KEY_COLUMN;
use crate::value::{Value, YdbType};

/// A single row with upper-cased, sorted columns
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRow {
    key: String,
    fields: BTreeMap<String, Vec<u8>>,
}

impl BatchRow {
    /// Normalise a harness row
    pub fn new(key: impl Into<String>, values: HashMap<String, Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            fields: values
                .into_iter()
                .map(|(field, value)| (field.to_uppercase(), value))
                .collect(),
        }
    }

    /// The row key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// `List<Struct<YCSB_KEY:Utf8, COL:String, ..>>` holding just this row
    pub fn into_value(self) -> Result<Value> {
        let mut members = Vec::with_capacity(self.fields.len() + 1);
        members.push((KEY_COLUMN.to_string(), Value::Text(self.key)));
        members.extend(
            self.fields
                .into_iter()
                .map(|(column, value)| (column, Value::Bytes(value))),
        );
        Value::list_from(vec![Value::struct_value(members)])
    }
}

/// Builder for multi-row `AS_TABLE` parameters
#[derive(Debug, Clone, Default)]
pub struct RowBatch {
    rows: Vec<BatchRow>,
    columns: BTreeSet<String>,
}

impl RowBatch {
    /// Create a new empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a batch from parallel key and value slices
    pub fn from_parts(keys: &[String], values: Vec<HashMap<String, Vec<u8>>>) -> Result<Self> {
        if keys.len() != values.len() {
            return Err(Error::value(format!(
                "batch has {} keys but {} value rows",
                keys.len(),
                values.len()
            )));
        }
        let mut batch = Self::new();
        for (key, row) in keys.iter().zip(values) {
            batch.push(key.clone(), row);
        }
        Ok(batch)
    }

    /// Add a row to the batch
    pub fn push(&mut self, key: impl Into<String>, values: HashMap<String, Vec<u8>>) {
        let row = BatchRow::new(key, values);
        self.columns.extend(row.fields.keys().cloned());
        self.rows.push(row);
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the batch has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Union of all row columns, sorted, excluding the key
    pub fn columns(&self) -> Vec<String> {
        self.columns.iter().cloned().collect()
    }

    /// The struct type every row is bound as
    pub fn row_type(&self) -> YdbType {
        let mut members = Vec::with_capacity(self.columns.len() + 1);
        members.push((KEY_COLUMN.to_string(), YdbType::Utf8));
        members.extend(
            self.columns
                .iter()
                .map(|c| (c.clone(), YdbType::String.optional())),
        );
        YdbType::Struct(members)
    }

    /// `List<Struct<YCSB_KEY:Utf8, COL:Optional<String>, ..>>` of all rows
    pub fn into_value(self) -> Result<Value> {
        let row_type = self.row_type();
        let items = self
            .rows
            .into_iter()
            .map(|mut row| {
                let mut members = Vec::with_capacity(self.columns.len() + 1);
                members.push((KEY_COLUMN.to_string(), Value::Text(row.key)));
                for column in &self.columns {
                    let value = row.fields.remove(column);
                    members.push((column.clone(), Value::nullable_bytes(value)));
                }
                Value::struct_value(members)
            })
            .collect();
        Value::list(row_type, items)
    }
}
