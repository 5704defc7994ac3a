//! Error types for the deduplication pipeline

use thiserror::Error;

use crate::record::RecordId;

/// Pipeline errors
///
/// Configuration errors abort a stage before any output is produced; data
/// errors report inputs for which a result is undefined. Recoverable
/// per-column problems during preprocessing are not errors, they surface as
/// warnings in the stage output.
#[derive(Error, Debug)]
pub enum Error {
    #[error("unknown {kind} '{name}'")]
    UnknownAlgorithm { kind: &'static str, name: String },

    #[error("{stage}: missing required parameter '{parameter}'")]
    MissingParameter {
        stage: &'static str,
        parameter: &'static str,
    },

    #[error("{stage}: invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        stage: &'static str,
        parameter: &'static str,
        reason: String,
    },

    #[error("column '{0}' not found in data")]
    MissingColumn(String),

    #[error("weight key '{0}' does not match any similarity column")]
    UnknownWeightColumn(String),

    #[error("record {0} referenced by a pair is not present in the data")]
    UnknownRecord(RecordId),

    #[error("duplicate record ID {0}")]
    DuplicateId(RecordId),

    #[error("row {0} has no integer 'ID' field")]
    MissingId(usize),

    #[error("row {row}: {reason}")]
    InvalidRecord { row: usize, reason: String },

    #[error("dataset is empty: {0} is undefined")]
    EmptyDataset(&'static str),

    #[error(transparent)]
    Filter(#[from] recdedup_filters::Error),
}

impl Error {
    /// Unknown names, missing or out-of-range parameters, absent columns
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::UnknownAlgorithm { .. }
                | Error::MissingParameter { .. }
                | Error::InvalidParameter { .. }
                | Error::MissingColumn(_)
                | Error::UnknownWeightColumn(_)
        )
    }

    /// Inputs for which the requested result is undefined
    pub fn is_data(&self) -> bool {
        !self.is_configuration()
    }
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;
