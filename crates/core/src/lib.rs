//! Core entity-resolution logic
//!
//! This crate provides the record model and the five pipeline stages:
//! preprocessing, block building, pairwise comparison, classification and
//! evaluation, plus a [`Pipeline`] that threads a table through all of them.

pub mod blocking;
pub mod classifier;
pub mod comparison;
pub mod error;
pub mod evaluation;
pub mod exact_dedup;
pub mod pipeline;
pub mod preprocess;
pub mod record;
pub mod similarity;

pub use blocking::{BlockBuilder, BlockedTable, BlockingConfig, BlockingStrategy};
pub use classifier::{ClassificationConfig, ClassifiedPairs, Classifier, Label};
pub use comparison::{CandidatePair, ComparisonConfig, ComparisonTable, PairComparator};
pub use error::{Error, Result};
pub use evaluation::{Evaluation, Evaluator, Statistics};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineConfig, PipelineOutput, StepSummary};
pub use preprocess::{ColumnSelection, PreprocessConfig, Preprocessed, Preprocessor};
pub use record::{Record, RecordId, Table, ID_COLUMN};
pub use similarity::SimilarityMetric;
