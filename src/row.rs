//! Result rows
//!
//! Query results arrive as column metadata plus rows of JSON cells. The
//! harness wants each row as a `column -> bytes` map, so every cell is
//! flattened to bytes according to its column type.

use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::db::Record;
use crate::error::{Error, Result};

/// Result column metadata
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Column {
    /// Column name
    pub name: String,
    /// YDB type name, e.g. `Utf8` or `Optional<String>`
    #[serde(rename = "type", default)]
    pub type_name: String,
}

impl Column {
    /// Create column metadata
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }

    /// Whether cells of this column carry base64-encoded bytes
    fn is_binary(&self) -> bool {
        let ty = self
            .type_name
            .strip_prefix("Optional<")
            .and_then(|t| t.strip_suffix('>'))
            .unwrap_or(&self.type_name);
        matches!(ty, "String" | "Bytes")
    }
}

/// A single result set
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResultSet {
    /// Column metadata in select order
    #[serde(default)]
    pub columns: Vec<Column>,
    /// Rows of cells, one cell per column
    #[serde(default)]
    pub rows: Vec<Vec<JsonValue>>,
}

impl ResultSet {
    /// Create a result set from columns and rows
    pub fn new(columns: Vec<Column>, rows: Vec<Vec<JsonValue>>) -> Self {
        Self { columns, rows }
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Convert every row into a `column -> bytes` record
    pub fn into_records(self) -> Result<Vec<Record>> {
        let columns = self.columns;
        self.rows
            .into_iter()
            .map(|cells| {
                if cells.len() != columns.len() {
                    return Err(Error::decode(format!(
                        "row has {} cells but result has {} columns",
                        cells.len(),
                        columns.len()
                    )));
                }
                let mut record = HashMap::with_capacity(columns.len());
                for (column, cell) in columns.iter().zip(cells) {
                    record.insert(column.name.clone(), read_cell(column, cell)?);
                }
                Ok(record)
            })
            .collect()
    }
}

/// Flatten one cell to bytes; `NULL` becomes an empty vector
fn read_cell(column: &Column, cell: JsonValue) -> Result<Vec<u8>> {
    match cell {
        JsonValue::Null => Ok(Vec::new()),
        JsonValue::String(s) if column.is_binary() => STANDARD.decode(s.as_bytes()).map_err(|e| {
            Error::decode(format!("column {} is not valid base64: {}", column.name, e))
        }),
        JsonValue::String(s) => Ok(s.into_bytes()),
        JsonValue::Number(n) => Ok(n.to_string().into_bytes()),
        JsonValue::Bool(b) => Ok(b.to_string().into_bytes()),
        JsonValue::Array(arr) if column.is_binary() => arr
            .iter()
            .map(|v| {
                v.as_u64()
                    .and_then(|n| u8::try_from(n).ok())
                    .ok_or_else(|| {
                        Error::decode(format!(
                            "column {} has a non-byte element: {}",
                            column.name, v
                        ))
                    })
            })
            .collect(),
        other => Ok(other.to_string().into_bytes()),
    }
}
