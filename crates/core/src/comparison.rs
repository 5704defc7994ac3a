//! Pairwise comparison of records within each block

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::blocking::{BlockedRecord, BlockedTable};
use crate::pipeline::StepSummary;
use crate::record::RecordId;
use crate::similarity::SimilarityMetric;
use crate::{Error, Result};

const STAGE: &str = "comparison";

/// Default q-gram length
pub const DEFAULT_Q_VALUE: usize = 2;

/// Comparison parameters: one metric name per column
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonConfig {
    #[serde(default)]
    pub selected_algorithms: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q_value: Option<usize>,
}

impl ComparisonConfig {
    /// Parse the metric names, in column order
    pub fn metrics(&self) -> Result<Vec<(String, SimilarityMetric)>> {
        if self.selected_algorithms.is_empty() {
            return Err(Error::InvalidParameter {
                stage: STAGE,
                parameter: "selectedAlgorithms",
                reason: "at least one column is required".to_string(),
            });
        }
        self.selected_algorithms
            .iter()
            .map(|(column, name)| Ok((column.clone(), name.parse()?)))
            .collect()
    }

    pub fn q_value(&self) -> Result<usize> {
        match self.q_value {
            Some(0) => Err(Error::InvalidParameter {
                stage: STAGE,
                parameter: "qValue",
                reason: "must be at least 1".to_string(),
            }),
            Some(q) => Ok(q),
            None => Ok(DEFAULT_Q_VALUE),
        }
    }
}

/// Two records of the same block with one score per compared column
#[derive(Debug, Clone, PartialEq)]
pub struct CandidatePair {
    pub block_id: u32,
    pub row1: RecordId,
    pub row2: RecordId,
    /// Scores aligned with [`ComparisonTable::columns`]
    pub scores: Vec<f64>,
}

/// Output of the comparison stage, ordered by ascending `block_id`
#[derive(Debug, Clone)]
pub struct ComparisonTable {
    columns: Vec<String>,
    pairs: Vec<CandidatePair>,
    summary: StepSummary,
}

impl ComparisonTable {
    pub(crate) fn new(columns: Vec<String>, pairs: Vec<CandidatePair>, summary: StepSummary) -> Self {
        Self {
            columns,
            pairs,
            summary,
        }
    }

    /// Compared columns
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Score column names, `<column>_similarity`
    pub fn similarity_columns(&self) -> Vec<String> {
        self.columns.iter().map(|c| similarity_column(c)).collect()
    }

    pub fn pairs(&self) -> &[CandidatePair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn summary(&self) -> &StepSummary {
        &self.summary
    }

    /// Records-array form: `block_id`, `row1`, `row2` and the score columns
    pub fn to_json_records(&self) -> Vec<Value> {
        let names = self.similarity_columns();
        self.pairs
            .iter()
            .map(|pair| Value::Object(pair_fields(pair, &names)))
            .collect()
    }
}

pub(crate) fn similarity_column(column: &str) -> String {
    format!("{column}_similarity")
}

pub(crate) fn pair_fields(pair: &CandidatePair, names: &[String]) -> Map<String, Value> {
    let mut object = Map::new();
    object.insert("block_id".to_string(), Value::from(pair.block_id));
    object.insert("row1".to_string(), Value::from(pair.row1.0));
    object.insert("row2".to_string(), Value::from(pair.row2.0));
    for (name, score) in names.iter().zip(&pair.scores) {
        object.insert(name.clone(), Value::from(*score));
    }
    object
}

/// Comparison stage
#[derive(Debug, Clone)]
pub struct PairComparator {
    metrics: Vec<(String, SimilarityMetric)>,
    q_value: usize,
}

impl PairComparator {
    pub fn new(config: &ComparisonConfig) -> Result<Self> {
        Ok(Self {
            metrics: config.metrics()?,
            q_value: config.q_value()?,
        })
    }

    /// Score every unordered pair of records sharing a block
    ///
    /// Blocks are compared in parallel; the merged output is re-sorted by
    /// `block_id` so results do not depend on scheduling.
    pub fn compare(&self, blocked: &BlockedTable) -> Result<ComparisonTable> {
        if let Some((missing, _)) = self.metrics.iter().find(|(c, _)| !blocked.has_column(c)) {
            return Err(Error::MissingColumn(missing.clone()));
        }

        let blocks: Vec<(u32, Vec<&BlockedRecord>)> = blocked.blocks().into_iter().collect();
        info!(
            "Comparing records within {} blocks on {} columns",
            blocks.len(),
            self.metrics.len()
        );

        let mut pairs: Vec<CandidatePair> = blocks
            .par_iter()
            .flat_map_iter(|(block_id, members)| self.compare_block(*block_id, members))
            .collect();
        pairs.sort_by_key(|pair| pair.block_id);

        info!("Generated {} candidate pairs", pairs.len());

        Ok(ComparisonTable::new(
            self.metrics.iter().map(|(c, _)| c.clone()).collect(),
            pairs,
            self.summary(),
        ))
    }

    fn compare_block(&self, block_id: u32, members: &[&BlockedRecord]) -> Vec<CandidatePair> {
        let mut pairs = Vec::with_capacity(members.len() * members.len().saturating_sub(1) / 2);
        for (i, first) in members.iter().enumerate() {
            for second in &members[i + 1..] {
                let scores = self
                    .metrics
                    .iter()
                    .map(|(column, metric)| {
                        metric.score(
                            first.record.value(column),
                            second.record.value(column),
                            self.q_value,
                        )
                    })
                    .collect();
                pairs.push(CandidatePair {
                    block_id,
                    row1: first.record.id,
                    row2: second.record.id,
                    scores,
                });
            }
        }
        debug!(
            "Block {}: {} records, {} pairs",
            block_id,
            members.len(),
            pairs.len()
        );
        pairs
    }

    fn summary(&self) -> StepSummary {
        let selected: Map<String, Value> = self
            .metrics
            .iter()
            .map(|(column, metric)| (column.clone(), Value::from(metric.name())))
            .collect();
        let mut names: Vec<&str> = self.metrics.iter().map(|(_, m)| m.name()).collect();
        names.sort_unstable();
        names.dedup();

        StepSummary::new(
            "comparison",
            names.join(", "),
            json!({ "selectedAlgorithms": selected, "qValue": self.q_value }),
        )
    }
}
