//! Raw dataset row as read from disk

use serde_json::{Map, Value};

use crate::{Error, Result};

/// A single row from a dataset file
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// The JSON data for this row
    pub data: Value,
    /// Source line number (JSON Lines) or array index (JSON)
    pub source_line: usize,
}

impl Record {
    /// Create a new record
    pub fn new(data: Value, source_line: usize) -> Self {
        Self { data, source_line }
    }

    /// Take the row as a column map; rows must be JSON objects
    pub fn into_object(self) -> Result<Map<String, Value>> {
        match self.data {
            Value::Object(map) => Ok(map),
            other => Err(Error::InvalidFile(format!(
                "row {} is not a JSON object: {}",
                self.source_line, other
            ))),
        }
    }
}
