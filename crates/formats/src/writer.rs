//! Streaming dataset writer
//!
//! Writes rows as a JSON array or as JSON Lines depending on the output
//! extension, gzip-compressing when the path ends in `.gz`. The closing
//! bracket and gzip trailer are only written by `close()`.

use crate::reader::DatasetFormat;
use crate::{Error, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use serde_json::Value;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

enum Sink {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl Sink {
    fn finish(self) -> Result<()> {
        match self {
            Sink::Plain(mut writer) => writer.flush()?,
            Sink::Gzip(encoder) => encoder.finish()?.flush()?,
        }
        Ok(())
    }
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Sink::Plain(writer) => writer.write(buf),
            Sink::Gzip(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Sink::Plain(writer) => writer.flush(),
            Sink::Gzip(encoder) => encoder.flush(),
        }
    }
}

/// Pick the output layout from the extension, looking through `.gz`
pub fn output_format<P: AsRef<Path>>(path: P) -> Result<DatasetFormat> {
    let name = path
        .as_ref()
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::UnsupportedFormat("No file name found".to_string()))?;
    let inner = name.strip_suffix(".gz").unwrap_or(name);

    match Path::new(inner).extension().and_then(|e| e.to_str()) {
        Some("json") => Ok(DatasetFormat::JsonArray),
        Some("jsonl") | Some("ndjson") => Ok(DatasetFormat::JsonLines),
        Some(other) => Err(Error::UnsupportedFormat(format!(
            "Unsupported output extension: {}",
            other
        ))),
        None => Err(Error::UnsupportedFormat(
            "No file extension found".to_string(),
        )),
    }
}

/// Row-at-a-time writer for JSON and JSON Lines output
pub struct DatasetWriter {
    sink: Sink,
    format: DatasetFormat,
    written: usize,
}

impl DatasetWriter {
    /// Create `path`, choosing layout and compression from its name
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let format = output_format(path)?;
        let file = BufWriter::new(File::create(path)?);

        let sink = match path.extension().and_then(|e| e.to_str()) {
            Some("gz") => Sink::Gzip(GzEncoder::new(file, Compression::default())),
            _ => Sink::Plain(file),
        };
        debug!("Writing {:?} output to {:?}", format, path);

        Ok(Self {
            sink,
            format,
            written: 0,
        })
    }

    /// Append one row
    pub fn write_row<T: Serialize + ?Sized>(&mut self, row: &T) -> Result<()> {
        match self.format {
            DatasetFormat::JsonLines => {
                serde_json::to_writer(&mut self.sink, row)?;
                self.sink.write_all(b"\n")?;
            }
            DatasetFormat::JsonArray => {
                let separator: &[u8] = if self.written == 0 { b"[\n" } else { b",\n" };
                self.sink.write_all(separator)?;
                serde_json::to_writer_pretty(&mut self.sink, row)?;
            }
        }
        self.written += 1;
        Ok(())
    }

    /// Number of rows written so far
    pub fn rows_written(&self) -> usize {
        self.written
    }

    /// Terminate the array and flush everything to disk
    ///
    /// This **must** be called to produce a valid file.
    pub fn close(mut self) -> Result<()> {
        if self.format == DatasetFormat::JsonArray {
            let tail: &[u8] = if self.written == 0 { b"[]\n" } else { b"\n]\n" };
            self.sink.write_all(tail)?;
        }
        self.sink.finish()
    }
}

/// Write all rows to `path` in one call
pub fn write_rows<P: AsRef<Path>>(path: P, rows: &[Value]) -> Result<()> {
    let mut writer = DatasetWriter::open(path)?;
    for row in rows {
        writer.write_row(row)?;
    }
    writer.close()
}

/// Write a single JSON document, pretty-printed
pub fn write_json<P: AsRef<Path>, T: Serialize + ?Sized>(path: P, value: &T) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut file, value)?;
    file.write_all(b"\n")?;
    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::load_rows;
    use serde_json::json;

    fn rows() -> Vec<Value> {
        vec![
            json!({"ID": 0, "name": "anna"}),
            json!({"ID": 1, "name": "bernd"}),
        ]
    }

    #[test]
    fn test_write_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_rows(&path, &rows()).unwrap();

        let parsed: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed, Value::Array(rows()));
    }

    #[test]
    fn test_write_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_rows(&path, &[]).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "[]");
    }

    #[test]
    fn test_write_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        let mut writer = DatasetWriter::open(&path).unwrap();
        for row in rows() {
            writer.write_row(&row).unwrap();
        }
        assert_eq!(writer.rows_written(), 2);
        writer.close().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert_eq!(content.lines().next().unwrap(), r#"{"ID":0,"name":"anna"}"#);
    }

    #[test]
    fn test_gzip_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["out.json.gz", "out.jsonl.gz"] {
            let path = dir.path().join(name);
            write_rows(&path, &rows()).unwrap();

            let loaded = load_rows(&path).unwrap();
            assert_eq!(loaded.len(), 2);
            assert_eq!(loaded[1]["name"], "bernd");
        }
    }

    #[test]
    fn test_unsupported_output() {
        let dir = tempfile::tempdir().unwrap();
        let result = DatasetWriter::open(dir.path().join("out.parquet"));
        assert!(matches!(result, Err(Error::UnsupportedFormat(_))));
    }

    #[test]
    fn test_write_json_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json");
        write_json(&path, &json!({"detected_duplicates": 3})).unwrap();

        let parsed: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed["detected_duplicates"], 3);
    }
}
