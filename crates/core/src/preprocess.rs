//! Preprocessing stage: text normalization and exact-duplicate removal
//!
//! Only textual columns are normalized. Numeric and boolean columns are left
//! alone without complaint; a column mixing text with other value types is
//! skipped and reported as a warning instead of failing the batch.

use recdedup_filters::TextNormalizer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::exact_dedup::ExactDeduplicator;
use crate::pipeline::StepSummary;
use crate::record::{Record, Table};
use crate::{Error, Result};

/// Which columns a stage operates on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub enum ColumnSelection {
    /// Every column except `ID`, written as `["all"]`
    All,
    Columns(Vec<String>),
}

impl From<Vec<String>> for ColumnSelection {
    fn from(columns: Vec<String>) -> Self {
        match columns.as_slice() {
            [first, ..] if first == "all" => ColumnSelection::All,
            _ => ColumnSelection::Columns(columns),
        }
    }
}

impl From<ColumnSelection> for Vec<String> {
    fn from(selection: ColumnSelection) -> Self {
        match selection {
            ColumnSelection::All => vec!["all".to_string()],
            ColumnSelection::Columns(columns) => columns,
        }
    }
}

impl Default for ColumnSelection {
    fn default() -> Self {
        ColumnSelection::All
    }
}

/// Preprocessing parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreprocessConfig {
    #[serde(default)]
    pub columns: ColumnSelection,
    #[serde(default)]
    pub lowercase: bool,
    #[serde(default)]
    pub remove_diacritics: bool,
    #[serde(default)]
    pub remove_punctuation: bool,
}

impl PreprocessConfig {
    pub fn validate(&self) -> Result<()> {
        if let ColumnSelection::Columns(columns) = &self.columns {
            if columns.is_empty() {
                return Err(Error::InvalidParameter {
                    stage: "preprocessing",
                    parameter: "columns",
                    reason: "at least one column (or \"all\") is required".to_string(),
                });
            }
        }
        Ok(())
    }

    fn normalizer(&self) -> TextNormalizer {
        TextNormalizer::new(
            self.lowercase,
            self.remove_diacritics,
            self.remove_punctuation,
        )
    }
}

/// A column the preprocessor had to leave untouched
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreprocessWarning {
    pub column: String,
    pub reason: String,
}

/// Output of the preprocessing stage
#[derive(Debug, Clone)]
pub struct Preprocessed {
    pub table: Table,
    /// Columns that went through the string transforms
    pub normalized_columns: Vec<String>,
    /// Rows dropped as exact duplicates
    pub removed_duplicates: usize,
    pub warnings: Vec<PreprocessWarning>,
    pub summary: StepSummary,
}

/// Preprocessing stage
#[derive(Debug, Clone)]
pub struct Preprocessor {
    config: PreprocessConfig,
}

impl Preprocessor {
    pub fn new(config: PreprocessConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Normalize text columns, then drop exact duplicates
    ///
    /// Rows are duplicates when identical across every selected text column;
    /// numeric and boolean columns are not part of the key. The first
    /// occurrence survives with its `ID` unchanged.
    pub fn run(&self, table: &Table) -> Result<Preprocessed> {
        info!(
            "Preprocessing {} records (lowercase={}, diacritics={}, punctuation={})",
            table.len(),
            self.config.lowercase,
            self.config.remove_diacritics,
            self.config.remove_punctuation
        );

        let mut warnings = Vec::new();
        let selected = self.resolve_columns(table, &mut warnings);
        let normalizer = self.config.normalizer();

        let text_columns: Vec<String> = selected
            .into_iter()
            .filter(|c| is_text_column(table, c))
            .collect();

        let mut records: Vec<Record> = table.records().to_vec();
        let mut normalized_columns = Vec::new();

        if !normalizer.is_noop() {
            for column in &text_columns {
                match normalize_column(&records, column, &normalizer) {
                    Ok(values) => {
                        for (record, value) in records.iter_mut().zip(values) {
                            if let Some(value) = value {
                                record.fields.insert(column.clone(), value);
                            }
                        }
                        normalized_columns.push(column.clone());
                    }
                    Err(e) => {
                        warn!("Skipping column '{}': {}", column, e);
                        warnings.push(PreprocessWarning {
                            column: column.clone(),
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        let removed_duplicates = if text_columns.is_empty() {
            warn!("No text columns selected, skipping exact-duplicate removal");
            0
        } else {
            let mut dedup = ExactDeduplicator::new(text_columns);
            records = dedup.dedup(records);
            debug!("Exact duplicate rate: {:.2}%", dedup.stats().dedup_rate());
            dedup.stats().duplicates_found
        };

        info!(
            "Preprocessing done: {} columns normalized, {} exact duplicates removed",
            normalized_columns.len(),
            removed_duplicates
        );

        Ok(Preprocessed {
            table: table.with_records(records),
            normalized_columns,
            removed_duplicates,
            warnings,
            summary: self.summary(),
        })
    }

    fn resolve_columns(&self, table: &Table, warnings: &mut Vec<PreprocessWarning>) -> Vec<String> {
        match &self.config.columns {
            ColumnSelection::All => table.columns().to_vec(),
            ColumnSelection::Columns(columns) => columns
                .iter()
                .filter(|column| {
                    let present = table.has_column(column);
                    if !present {
                        warn!("Column '{}' not found in data, skipping", column);
                        warnings.push(PreprocessWarning {
                            column: column.to_string(),
                            reason: "column not found in data".to_string(),
                        });
                    }
                    present
                })
                .cloned()
                .collect(),
        }
    }

    fn summary(&self) -> StepSummary {
        StepSummary::new(
            "data_preprocessing",
            "text_normalization",
            serde_json::to_value(&self.config).unwrap_or(Value::Null),
        )
    }
}

/// A column is textual when it holds at least one string value
fn is_text_column(table: &Table, column: &str) -> bool {
    let textual = table
        .records()
        .iter()
        .any(|r| matches!(r.value(column), Value::String(_)));
    if !textual {
        debug!("Column '{}' holds no text, excluded from string operations", column);
    }
    textual
}

/// Normalize every value of a column, failing on the first non-text value
///
/// `None` marks records that do not carry the column at all.
fn normalize_column(
    records: &[Record],
    column: &str,
    normalizer: &TextNormalizer,
) -> Result<Vec<Option<Value>>> {
    records
        .iter()
        .map(|r| match r.fields.get(column) {
            Some(value) => Ok(Some(normalizer.normalize_value(value)?)),
            None => Ok(None),
        })
        .collect()
}
