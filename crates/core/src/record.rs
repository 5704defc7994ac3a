//! Record and table data structures shared by every pipeline stage

use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::{Error, Result};

/// Name of the identifier column in records-array form
pub const ID_COLUMN: &str = "ID";

/// Stable record identifier assigned at ingestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A single record: its identifier plus ordered column values
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: RecordId,
    /// Column values, never containing the `ID` column
    pub fields: Map<String, Value>,
}

impl Record {
    /// Create a new record
    pub fn new(id: impl Into<RecordId>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Value of a column, `Null` when the record lacks it
    pub fn value(&self, column: &str) -> &Value {
        self.fields.get(column).unwrap_or(&Value::Null)
    }

    /// Records-array form with `ID` as the first key
    pub fn to_json(&self) -> Value {
        let mut object = Map::with_capacity(self.fields.len() + 1);
        object.insert(ID_COLUMN.to_string(), Value::from(self.id.0));
        for (key, value) in &self.fields {
            object.insert(key.clone(), value.clone());
        }
        Value::Object(object)
    }
}

/// An ordered sequence of records sharing one column schema
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl Table {
    /// Build a table from records, rejecting duplicate IDs
    pub fn new(records: Vec<Record>) -> Result<Self> {
        let mut seen = AHashSet::with_capacity(records.len());
        for record in &records {
            if !seen.insert(record.id) {
                return Err(Error::DuplicateId(record.id));
            }
        }
        Ok(Self::from_unique(records))
    }

    /// Build a table from records already known to carry unique IDs
    pub(crate) fn from_unique(records: Vec<Record>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        let mut known: AHashSet<&str> = AHashSet::new();
        for record in &records {
            for key in record.fields.keys() {
                if known.insert(key.as_str()) {
                    columns.push(key.clone());
                }
            }
        }
        Self { columns, records }
    }

    /// Parse the records-array form; every row must carry an integer `ID`
    pub fn from_json_records(rows: Vec<Value>) -> Result<Self> {
        let mut records = Vec::with_capacity(rows.len());
        for (row, value) in rows.into_iter().enumerate() {
            let Value::Object(mut fields) = value else {
                return Err(Error::InvalidRecord {
                    row,
                    reason: "expected a JSON object".to_string(),
                });
            };
            let id = fields
                .shift_remove(ID_COLUMN)
                .and_then(|v| v.as_i64())
                .ok_or(Error::MissingId(row))?;
            records.push(Record::new(id, fields));
        }
        Self::new(records)
    }

    /// Assign IDs `0..n` in input order, replacing any existing `ID` field
    pub fn from_rows_assigning_ids(rows: Vec<Map<String, Value>>) -> Self {
        let records = rows
            .into_iter()
            .enumerate()
            .map(|(i, mut fields)| {
                fields.shift_remove(ID_COLUMN);
                Record::new(i as i64, fields)
            })
            .collect();
        Self::from_unique(records)
    }

    /// Column names in first-seen order, excluding `ID`
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// IDs in table order
    pub fn ids(&self) -> Vec<RecordId> {
        self.records.iter().map(|r| r.id).collect()
    }

    /// Keep only records whose ID is in `ids`, preserving order and schema
    pub fn retain_ids(&self, ids: &AHashSet<RecordId>) -> Table {
        Table {
            columns: self.columns.clone(),
            records: self
                .records
                .iter()
                .filter(|r| ids.contains(&r.id))
                .cloned()
                .collect(),
        }
    }

    /// Drop every record whose ID is in `ids`, preserving order and schema
    pub fn without_ids(&self, ids: &AHashSet<RecordId>) -> Table {
        Table {
            columns: self.columns.clone(),
            records: self
                .records
                .iter()
                .filter(|r| !ids.contains(&r.id))
                .cloned()
                .collect(),
        }
    }

    /// Replace the records, keeping the column schema
    pub(crate) fn with_records(&self, records: Vec<Record>) -> Table {
        Table {
            columns: self.columns.clone(),
            records,
        }
    }

    /// Records-array form
    pub fn to_json_records(&self) -> Vec<Value> {
        self.records.iter().map(Record::to_json).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_records() {
        let table = Table::from_json_records(vec![
            json!({"ID": 0, "name": "alice", "city": "paris"}),
            json!({"ID": 1, "name": "bob", "zip": "75001"}),
        ])
        .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.columns(), &["name", "city", "zip"]);
        assert_eq!(table.records()[1].value("city"), &Value::Null);
        assert!(!table.records()[0].fields.contains_key(ID_COLUMN));
    }

    #[test]
    fn test_missing_id() {
        let err = Table::from_json_records(vec![json!({"ID": 0}), json!({"name": "x"})]).unwrap_err();
        assert!(matches!(err, Error::MissingId(1)));
    }

    #[test]
    fn test_duplicate_id() {
        let err = Table::from_json_records(vec![json!({"ID": 3}), json!({"ID": 3})]).unwrap_err();
        assert!(matches!(err, Error::DuplicateId(RecordId(3))));
    }

    #[test]
    fn test_non_object_row() {
        let err = Table::from_json_records(vec![json!([1, 2])]).unwrap_err();
        assert!(matches!(err, Error::InvalidRecord { row: 0, .. }));
    }

    #[test]
    fn test_assigning_ids() {
        let rows = vec![
            json!({"ID": 99, "name": "a"}),
            json!({"name": "b"}),
        ]
        .into_iter()
        .map(|v| v.as_object().cloned().unwrap())
        .collect();

        let table = Table::from_rows_assigning_ids(rows);
        assert_eq!(table.ids(), vec![RecordId(0), RecordId(1)]);
    }

    #[test]
    fn test_to_json_puts_id_first() {
        let table = Table::from_json_records(vec![json!({"name": "a", "ID": 7})]).unwrap();
        let out = table.to_json_records();
        let keys: Vec<&String> = out[0].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["ID", "name"]);
        assert_eq!(out[0]["ID"], 7);
    }

    #[test]
    fn test_id_removal_keeps_column_order() {
        let table = Table::from_json_records(vec![
            json!({"ID": 0, "first": "a", "last": "b", "city": "c"}),
        ])
        .unwrap();
        assert_eq!(table.columns(), &["first", "last", "city"]);

        let out = table.to_json_records();
        let keys: Vec<&String> = out[0].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["ID", "first", "last", "city"]);

        let rows = vec![json!({"ID": 5, "first": "a", "last": "b", "city": "c"})
            .as_object()
            .cloned()
            .unwrap()];
        let assigned = Table::from_rows_assigning_ids(rows);
        assert_eq!(assigned.columns(), &["first", "last", "city"]);
    }

    #[test]
    fn test_without_ids() {
        let table = Table::from_json_records(vec![
            json!({"ID": 0, "a": 1}),
            json!({"ID": 1, "a": 2}),
            json!({"ID": 2, "a": 3}),
        ])
        .unwrap();
        let drop: AHashSet<RecordId> = [RecordId(1)].into_iter().collect();
        assert_eq!(table.without_ids(&drop).ids(), vec![RecordId(0), RecordId(2)]);
        assert_eq!(table.retain_ids(&drop).ids(), vec![RecordId(1)]);
    }
}
