//! Dataset readers and writers
//!
//! Reads record tables from JSON arrays or JSON Lines, optionally gzip
//! compressed, and writes pipeline results back out in the same formats.

pub mod error;
pub mod json;
pub mod jsonl;
pub mod reader;
pub mod record;
pub mod writer;

pub use error::{Error, Result};
pub use reader::{
    detect_format, load_rows, open_dataset, open_dataset_with, DatasetFormat, DatasetReader,
};
pub use record::Record;
pub use writer::{write_json, write_rows, DatasetWriter};
