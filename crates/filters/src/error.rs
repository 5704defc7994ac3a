//! Error types for filters

use thiserror::Error;

/// Filter errors
#[derive(Error, Debug)]
pub enum Error {
    #[error("expected a text value, found {0}")]
    NonTextValue(&'static str),
}

/// Result type alias for filter operations
pub type Result<T> = std::result::Result<T, Error>;
