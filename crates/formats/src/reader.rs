//! Unified dataset reader abstraction
//!
//! Provides a common interface for reading the supported dataset formats
//! with automatic format detection based on file extensions.

use crate::json::JsonArrayReader;
use crate::jsonl::{open_input, JsonlReader};
use crate::{Error, Record, Result};
use serde_json::{Map, Value};
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{info, warn};

/// Trait for dataset readers providing unified interface
pub trait DatasetReader: Iterator<Item = Result<Record>> {
    /// Get total file size in bytes if known
    fn total_bytes(&self) -> Option<u64>;

    /// Get total number of records if known up front
    fn total_records(&self) -> Option<u64>;

    /// Get number of bytes processed so far
    fn bytes_processed(&self) -> u64;

    /// Get the number of records processed
    fn records_processed(&self) -> usize;

    /// Number of malformed records skipped so far
    fn skipped_records(&self) -> usize {
        0
    }
}

/// On-disk layout of a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    /// One JSON object per line
    JsonLines,
    /// One JSON array of objects
    JsonArray,
}

/// Detect the format from the extension, looking through a `.gz` suffix
///
/// `.json` files are sniffed: a leading `[` means a JSON array, anything
/// else is read as JSON Lines.
pub fn detect_format<P: AsRef<Path>>(path: P) -> Result<DatasetFormat> {
    let path = path.as_ref();
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::UnsupportedFormat("No file name found".to_string()))?;
    let inner = name.strip_suffix(".gz").unwrap_or(name);
    let extension = Path::new(inner)
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| Error::UnsupportedFormat("No file extension found".to_string()))?;

    match extension {
        "jsonl" | "ndjson" => Ok(DatasetFormat::JsonLines),
        "json" => sniff_json(path),
        other => Err(Error::UnsupportedFormat(format!(
            "Unsupported file extension: {}",
            other
        ))),
    }
}

fn sniff_json(path: &Path) -> Result<DatasetFormat> {
    let (reader, _) = open_input(path)?;
    let mut reader = BufReader::new(reader);
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            return Ok(DatasetFormat::JsonLines);
        }
        if let Some(&byte) = buf.iter().find(|b| !b.is_ascii_whitespace()) {
            return Ok(if byte == b'[' {
                DatasetFormat::JsonArray
            } else {
                DatasetFormat::JsonLines
            });
        }
        let consumed = buf.len();
        reader.consume(consumed);
    }
}

/// JSONL dataset reader wrapper
pub struct JsonlDatasetReader {
    reader: JsonlReader<Box<dyn std::io::Read>>,
}

impl Iterator for JsonlDatasetReader {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.next()
    }
}

impl DatasetReader for JsonlDatasetReader {
    fn total_bytes(&self) -> Option<u64> {
        self.reader.total_bytes()
    }

    fn total_records(&self) -> Option<u64> {
        None // JSONL doesn't have metadata for total record count
    }

    fn bytes_processed(&self) -> u64 {
        self.reader.bytes_processed()
    }

    fn records_processed(&self) -> usize {
        self.reader.lines_processed()
    }

    fn skipped_records(&self) -> usize {
        self.reader.skipped_lines()
    }
}

impl DatasetReader for JsonArrayReader {
    fn total_bytes(&self) -> Option<u64> {
        JsonArrayReader::total_bytes(self)
    }

    fn total_records(&self) -> Option<u64> {
        Some(JsonArrayReader::total_records(self))
    }

    fn bytes_processed(&self) -> u64 {
        // The array is parsed in one go
        match (self.total_bytes(), JsonArrayReader::total_records(self)) {
            (Some(bytes), records) if records > 0 => {
                bytes * self.records_processed() as u64 / records
            }
            _ => 0,
        }
    }

    fn records_processed(&self) -> usize {
        JsonArrayReader::records_processed(self)
    }
}

/// Factory function to open a dataset with automatic format detection
///
/// Supported formats:
/// - `.jsonl`, `.ndjson` - JSON Lines format
/// - `.json` - JSON array, or JSON Lines when the file does not start with `[`
/// - any of the above with a `.gz` suffix
pub fn open_dataset<P: AsRef<Path>>(path: P) -> Result<Box<dyn DatasetReader>> {
    open_dataset_with(path, false)
}

/// Like [`open_dataset`], failing on malformed JSON Lines when `strict`
///
/// A JSON array is parsed whole, so it always fails on malformed input.
pub fn open_dataset_with<P: AsRef<Path>>(path: P, strict: bool) -> Result<Box<dyn DatasetReader>> {
    let path = path.as_ref();
    let format = detect_format(path)?;

    info!("Opening dataset: {:?} (format: {:?}, strict: {})", path, format, strict);

    match format {
        DatasetFormat::JsonLines => {
            let reader = JsonlReader::open(path)?.strict(strict);
            Ok(Box::new(JsonlDatasetReader { reader }))
        }
        DatasetFormat::JsonArray => Ok(Box::new(JsonArrayReader::open(path)?)),
    }
}

/// Read every row of a dataset as a column map
///
/// Rows that are not JSON objects are an error.
pub fn load_rows<P: AsRef<Path>>(path: P) -> Result<Vec<Map<String, Value>>> {
    let reader = open_dataset(path)?;
    let rows = reader
        .map(|record| record.and_then(Record::into_object))
        .collect::<Result<Vec<_>>>()?;
    if rows.is_empty() {
        warn!("Dataset contains no rows");
    }
    Ok(rows)
}
