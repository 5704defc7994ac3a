//! Records-array JSON reader
//!
//! Reads a file holding one JSON array of row objects, the layout produced by
//! most table exports. The whole array is parsed up front.

use crate::jsonl::open_input;
use crate::{Error, Record, Result};
use serde_json::Value;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;

/// Reader over the rows of a JSON array
pub struct JsonArrayReader {
    rows: std::vec::IntoIter<Value>,
    index: usize,
    total_records: u64,
    total_bytes: Option<u64>,
}

impl JsonArrayReader {
    /// Open a JSON array file, auto-detecting gzip compression
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let (reader, total_bytes) = open_input(path.as_ref())?;
        let mut array = Self::from_reader(reader)?;
        array.total_bytes = total_bytes;
        Ok(array)
    }

    /// Parse a JSON array from any Read source
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let value: Value = serde_json::from_reader(BufReader::new(reader))?;
        let Value::Array(rows) = value else {
            return Err(Error::InvalidFile(
                "expected a top-level JSON array of records".to_string(),
            ));
        };
        debug!("Parsed JSON array with {} rows", rows.len());

        Ok(Self {
            total_records: rows.len() as u64,
            rows: rows.into_iter(),
            index: 0,
            total_bytes: None,
        })
    }

    pub fn total_records(&self) -> u64 {
        self.total_records
    }

    pub fn total_bytes(&self) -> Option<u64> {
        self.total_bytes
    }

    pub fn records_processed(&self) -> usize {
        self.index
    }
}

impl Iterator for JsonArrayReader {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        let value = self.rows.next()?;
        let record = Record::new(value, self.index);
        self.index += 1;
        Some(Ok(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_json_array() {
        let data = r#"[{"ID": 0, "name": "anna"}, {"ID": 1, "name": "bernd"}]"#;
        let mut reader = JsonArrayReader::from_reader(data.as_bytes()).unwrap();

        assert_eq!(reader.total_records(), 2);
        let first = reader.next().unwrap().unwrap();
        assert_eq!(first.data["name"], "anna");
        assert_eq!(first.source_line, 0);
        assert_eq!(reader.records_processed(), 1);
        assert_eq!(reader.count(), 1);
    }

    #[test]
    fn test_not_an_array() {
        let result = JsonArrayReader::from_reader(r#"{"ID": 0}"#.as_bytes());
        assert!(matches!(result, Err(Error::InvalidFile(_))));
    }

    #[test]
    fn test_malformed_json() {
        let result = JsonArrayReader::from_reader(r#"[{"ID": 0},"#.as_bytes());
        assert!(matches!(result, Err(Error::JsonParse(_))));
    }

    #[test]
    fn test_json_array_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.json");
        {
            let mut file = std::fs::File::create(&path).unwrap();
            write!(file, r#"[{{"ID": 7, "name": "carla"}}]"#).unwrap();
        }

        let reader = JsonArrayReader::open(&path).unwrap();
        assert!(reader.total_bytes().unwrap() > 0);
        let records: Vec<_> = reader.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(records[0].data["ID"], 7);
    }
}
