//! Block building: partition records into groups of likely duplicates
//!
//! Three strategies are available:
//!
//! - **Standard blocking** groups records sharing a blocking key value (BKV),
//!   the space-joined Soundex codes of the selected columns.
//! - **Sorted neighborhood** sorts records by a sorting key value (SKV) and
//!   cuts the sorted sequence into fixed-size windows.
//! - **Dynamic sorted neighborhood** uses the same SKV ordering but grows each
//!   window while the next SKV stays similar to the window's first one.

use ahash::AHashMap;
use recdedup_filters::soundex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::pipeline::StepSummary;
use crate::record::{Record, Table};
use crate::similarity::indel_ratio;
use crate::{Error, Result};

const STAGE: &str = "block building";

/// Default number of extra characters taken per column for the SKV
pub const DEFAULT_N_LETTERS: usize = 3;

/// Block building parameters as they appear in a pipeline config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockingConfig {
    /// `standardBlocking`, `sortedNeighborhood` or `dynamicSortedNeighborhood`
    pub algorithm: String,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_letters: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_window_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

impl BlockingConfig {
    /// Resolve the strategy, checking every parameter it needs
    pub fn strategy(&self) -> Result<BlockingStrategy> {
        if self.columns.is_empty() {
            return Err(Error::InvalidParameter {
                stage: STAGE,
                parameter: "columns",
                reason: "at least one column is required".to_string(),
            });
        }

        let n_letters = self.n_letters.unwrap_or(DEFAULT_N_LETTERS);
        match self.algorithm.as_str() {
            "standardBlocking" => Ok(BlockingStrategy::Standard),
            "sortedNeighborhood" => Ok(BlockingStrategy::SortedNeighborhood {
                window_size: positive(self.window_size, "windowSize")?,
                n_letters,
            }),
            "dynamicSortedNeighborhood" => {
                let max_window_size = positive(self.max_window_size, "maxWindowSize")?;
                let match_threshold = self.threshold.ok_or(Error::MissingParameter {
                    stage: STAGE,
                    parameter: "threshold",
                })?;
                if !(0.0..=1.0).contains(&match_threshold) {
                    return Err(Error::InvalidParameter {
                        stage: STAGE,
                        parameter: "threshold",
                        reason: format!("{match_threshold} is outside [0, 1]"),
                    });
                }
                Ok(BlockingStrategy::DynamicSortedNeighborhood {
                    max_window_size,
                    match_threshold,
                    n_letters,
                })
            }
            other => Err(Error::UnknownAlgorithm {
                kind: "blocking algorithm",
                name: other.to_string(),
            }),
        }
    }
}

fn positive(value: Option<usize>, parameter: &'static str) -> Result<usize> {
    match value {
        None => Err(Error::MissingParameter {
            stage: STAGE,
            parameter,
        }),
        Some(0) => Err(Error::InvalidParameter {
            stage: STAGE,
            parameter,
            reason: "must be at least 1".to_string(),
        }),
        Some(v) => Ok(v),
    }
}

/// A validated blocking strategy
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlockingStrategy {
    Standard,
    SortedNeighborhood {
        window_size: usize,
        n_letters: usize,
    },
    DynamicSortedNeighborhood {
        max_window_size: usize,
        match_threshold: f64,
        n_letters: usize,
    },
}

impl BlockingStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Standard => "standardBlocking",
            Self::SortedNeighborhood { .. } => "sortedNeighborhood",
            Self::DynamicSortedNeighborhood { .. } => "dynamicSortedNeighborhood",
        }
    }

    /// Column name under which the blocking key is exported
    pub fn key_column(&self) -> &'static str {
        match self {
            Self::Standard => "BKV",
            _ => "SKV",
        }
    }

    fn parameters(&self, columns: &[String]) -> Value {
        match *self {
            Self::Standard => json!({ "columns": columns }),
            Self::SortedNeighborhood {
                window_size,
                n_letters,
            } => json!({
                "columns": columns,
                "windowSize": window_size,
                "nLetters": n_letters,
            }),
            Self::DynamicSortedNeighborhood {
                max_window_size,
                match_threshold,
                n_letters,
            } => json!({
                "columns": columns,
                "maxWindowSize": max_window_size,
                "threshold": match_threshold,
                "nLetters": n_letters,
            }),
        }
    }
}

/// A record with its block assignment and blocking key
#[derive(Debug, Clone, PartialEq)]
pub struct BlockedRecord {
    pub record: Record,
    pub block_id: u32,
    /// BKV or SKV, depending on the strategy
    pub key: String,
}

/// Output of the block building stage
///
/// Records keep input order under standard blocking and SKV order under the
/// neighborhood strategies.
#[derive(Debug, Clone)]
pub struct BlockedTable {
    strategy: BlockingStrategy,
    columns: Vec<String>,
    records: Vec<BlockedRecord>,
    num_blocks: usize,
    summary: StepSummary,
}

impl BlockedTable {
    pub fn strategy(&self) -> BlockingStrategy {
        self.strategy
    }

    /// Data columns of the blocked records, excluding `ID` and block metadata
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn records(&self) -> &[BlockedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    /// Records of one block in blocked order; empty for an unknown id
    pub fn block(&self, block_id: u32) -> Vec<&BlockedRecord> {
        self.records
            .iter()
            .filter(|r| r.block_id == block_id)
            .collect()
    }

    /// All blocks by ascending id, each in blocked order
    pub fn blocks(&self) -> BTreeMap<u32, Vec<&BlockedRecord>> {
        let mut blocks: BTreeMap<u32, Vec<&BlockedRecord>> = BTreeMap::new();
        for record in &self.records {
            blocks.entry(record.block_id).or_default().push(record);
        }
        blocks
    }

    /// Number of records per block id
    pub fn block_sizes(&self) -> BTreeMap<u32, usize> {
        let mut sizes = BTreeMap::new();
        for record in &self.records {
            *sizes.entry(record.block_id).or_insert(0) += 1;
        }
        sizes
    }

    pub fn summary(&self) -> &StepSummary {
        &self.summary
    }

    /// Records-array form with `block_id` and the key column appended
    pub fn to_json_records(&self) -> Vec<Value> {
        let key_column = self.strategy.key_column();
        self.records
            .iter()
            .map(|r| {
                let mut value = r.record.to_json();
                if let Value::Object(object) = &mut value {
                    object.insert(key_column.to_string(), Value::from(r.key.clone()));
                    object.insert("block_id".to_string(), Value::from(r.block_id));
                }
                value
            })
            .collect()
    }
}

/// Block building stage
#[derive(Debug, Clone)]
pub struct BlockBuilder {
    columns: Vec<String>,
    strategy: BlockingStrategy,
}

impl BlockBuilder {
    pub fn new(config: &BlockingConfig) -> Result<Self> {
        Ok(Self {
            strategy: config.strategy()?,
            columns: config.columns.clone(),
        })
    }

    pub fn strategy(&self) -> BlockingStrategy {
        self.strategy
    }

    /// Assign every record of `table` to exactly one block
    pub fn build(&self, table: &Table) -> Result<BlockedTable> {
        if let Some(missing) = self.columns.iter().find(|c| !table.has_column(c)) {
            return Err(Error::MissingColumn(missing.clone()));
        }

        info!(
            "Building blocks for {} records using {} on {:?}",
            table.len(),
            self.strategy.name(),
            self.columns
        );

        let (records, num_blocks) = match self.strategy {
            BlockingStrategy::Standard => self.standard(table),
            BlockingStrategy::SortedNeighborhood {
                window_size,
                n_letters,
            } => {
                let mut records = self.sorted_by_skv(table, n_letters);
                for (index, record) in records.iter_mut().enumerate() {
                    record.block_id = (index / window_size) as u32 + 1;
                }
                let num_blocks = records.len().div_ceil(window_size);
                (records, num_blocks)
            }
            BlockingStrategy::DynamicSortedNeighborhood {
                max_window_size,
                match_threshold,
                n_letters,
            } => {
                let mut records = self.sorted_by_skv(table, n_letters);
                let num_blocks = assign_dynamic_windows(&mut records, max_window_size, match_threshold);
                (records, num_blocks)
            }
        };

        info!("Built {} blocks", num_blocks);

        Ok(BlockedTable {
            strategy: self.strategy,
            columns: table.columns().to_vec(),
            records,
            num_blocks,
            summary: StepSummary::new(
                "block_building",
                self.strategy.name(),
                self.strategy.parameters(&self.columns),
            ),
        })
    }

    /// Group identical BKVs, numbering blocks by first appearance
    fn standard(&self, table: &Table) -> (Vec<BlockedRecord>, usize) {
        let mut block_ids: AHashMap<String, u32> = AHashMap::new();
        let records = table
            .records()
            .iter()
            .map(|record| {
                let key = self.bkv(record);
                let next = block_ids.len() as u32 + 1;
                let block_id = *block_ids.entry(key.clone()).or_insert(next);
                BlockedRecord {
                    record: record.clone(),
                    block_id,
                    key,
                }
            })
            .collect();
        (records, block_ids.len())
    }

    fn bkv(&self, record: &Record) -> String {
        self.columns
            .iter()
            .map(|c| match record.value(c) {
                Value::String(s) => soundex(s),
                _ => String::new(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// First `n_letters + 1` characters of each column, concatenated
    fn skv(&self, record: &Record, n_letters: usize) -> String {
        self.columns
            .iter()
            .filter_map(|c| match record.value(c) {
                Value::String(s) => Some(s.chars().take(n_letters + 1).collect::<String>()),
                _ => None,
            })
            .collect()
    }

    /// Records stably sorted by SKV, block ids still unassigned
    fn sorted_by_skv(&self, table: &Table, n_letters: usize) -> Vec<BlockedRecord> {
        let mut records: Vec<BlockedRecord> = table
            .records()
            .iter()
            .map(|record| BlockedRecord {
                key: self.skv(record, n_letters),
                record: record.clone(),
                block_id: 0,
            })
            .collect();
        records.sort_by(|a, b| a.key.cmp(&b.key));
        records
    }
}

/// Grow each window while the next SKV stays close to the window's first
///
/// Returns the number of windows formed.
fn assign_dynamic_windows(
    records: &mut [BlockedRecord],
    max_window_size: usize,
    match_threshold: f64,
) -> usize {
    let cutoff = match_threshold * 100.0;
    let mut block_id = 0u32;
    let mut start = 0;

    while start < records.len() {
        let mut end = start + 1;
        while end < records.len() && end - start < max_window_size {
            let ratio = indel_ratio(&records[start].key, &records[end].key);
            if ratio < cutoff {
                break;
            }
            end += 1;
        }

        block_id += 1;
        debug!("Window {} spans sorted rows {}..{}", block_id, start, end);
        for record in &mut records[start..end] {
            record.block_id = block_id;
        }
        start = end;
    }

    block_id as usize
}
