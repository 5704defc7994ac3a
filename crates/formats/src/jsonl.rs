//! Streaming JSONL (JSON Lines) reader
//!
//! Reads one JSON object per line with automatic gzip decompression.
//! Malformed lines are skipped with a warning unless the reader is strict.

use crate::{Error, Record, Result};
use flate2::read::GzDecoder;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tracing::{debug, warn};

/// Configuration for JSONL reader
#[derive(Debug, Clone)]
pub struct JsonlConfig {
    /// Fail on the first malformed line instead of skipping it
    pub strict: bool,
    /// Buffer size for BufReader
    pub buffer_size: usize,
}

impl Default for JsonlConfig {
    fn default() -> Self {
        Self {
            strict: false,
            buffer_size: 64 * 1024, // 64KB buffer
        }
    }
}

/// Open a file for reading, decompressing `.gz` transparently
///
/// The byte size is only reported for uncompressed files.
pub(crate) fn open_input(path: &Path) -> Result<(Box<dyn Read>, Option<u64>)> {
    let file = File::open(path)?;
    let total_bytes = file.metadata()?.len();

    match path.extension().and_then(|e| e.to_str()) {
        Some("gz") => {
            debug!("Opening gzip-compressed file: {:?}", path);
            Ok((Box::new(GzDecoder::new(file)), None))
        }
        _ => {
            debug!("Opening plain file: {:?}", path);
            Ok((Box::new(file), Some(total_bytes)))
        }
    }
}

/// Streaming JSONL reader that processes files line-by-line
pub struct JsonlReader<R: Read> {
    reader: BufReader<R>,
    config: JsonlConfig,
    line_number: usize,
    bytes_read: u64,
    total_bytes: Option<u64>,
    skipped: usize,
}

impl JsonlReader<Box<dyn Read>> {
    /// Open a JSONL file, auto-detecting gzip compression
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let (reader, total_bytes) = open_input(path.as_ref())?;
        Ok(Self::new_with_config(reader, JsonlConfig::default(), total_bytes))
    }
}

impl<R: Read> JsonlReader<R> {
    /// Create a new JSONL reader from any Read source
    pub fn new(reader: R) -> Self {
        Self::new_with_config(reader, JsonlConfig::default(), None)
    }

    /// Create a new JSONL reader with custom configuration
    pub fn new_with_config(reader: R, config: JsonlConfig, total_bytes: Option<u64>) -> Self {
        let buf_reader = BufReader::with_capacity(config.buffer_size, reader);
        Self {
            reader: buf_reader,
            config,
            line_number: 0,
            bytes_read: 0,
            total_bytes,
            skipped: 0,
        }
    }

    /// Fail on malformed lines
    pub fn strict(mut self, strict: bool) -> Self {
        self.config.strict = strict;
        self
    }

    /// Get the number of lines processed
    pub fn lines_processed(&self) -> usize {
        self.line_number
    }

    /// Get the number of bytes read
    pub fn bytes_processed(&self) -> u64 {
        self.bytes_read
    }

    /// Get total file size if known
    pub fn total_bytes(&self) -> Option<u64> {
        self.total_bytes
    }

    /// Number of malformed lines skipped so far
    pub fn skipped_lines(&self) -> usize {
        self.skipped
    }
}

impl<R: Read> Iterator for JsonlReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut line = String::new();

        loop {
            line.clear();
            match self.reader.read_line(&mut line) {
                Ok(0) => return None, // EOF
                Ok(n) => {
                    self.bytes_read += n as u64;
                    self.line_number += 1;

                    // Skip empty lines
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    match serde_json::from_str::<Value>(trimmed) {
                        Ok(value) => return Some(Ok(Record::new(value, self.line_number))),
                        Err(e) if self.config.strict => {
                            return Some(Err(Error::InvalidFile(format!(
                                "line {}: {}",
                                self.line_number, e
                            ))));
                        }
                        Err(e) => {
                            warn!(
                                "Failed to parse JSON at line {}: {} - Error: {}",
                                self.line_number, trimmed, e
                            );
                            self.skipped += 1;
                            continue;
                        }
                    }
                }
                Err(e) => {
                    return Some(Err(Error::Io(e)));
                }
            }
        }
    }
}
