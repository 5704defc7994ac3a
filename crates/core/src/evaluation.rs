//! Evaluation: deduplicated table, side-by-side matches, statistics

use ahash::{AHashMap, AHashSet};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::info;

use crate::classifier::ClassifiedPairs;
use crate::record::{Record, RecordId, Table};
use crate::{Error, Result};

/// One side of a matched pair in the side-by-side view
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedRow {
    /// Shared by both rows of a match, counting from 1
    pub dedup_id: usize,
    /// `true` for the `row2` record removed from the deduplicated table
    pub dropped: bool,
    pub record: Record,
}

impl MatchedRow {
    /// `dedup_id` first, then the record, then `dropped` as `YES`/`NO`
    pub fn to_json(&self) -> Value {
        let mut object = serde_json::Map::new();
        object.insert("dedup_id".to_string(), Value::from(self.dedup_id));
        if let Value::Object(fields) = self.record.to_json() {
            object.extend(fields);
        }
        object.insert(
            "dropped".to_string(),
            Value::from(if self.dropped { "YES" } else { "NO" }),
        );
        Value::Object(object)
    }
}

/// Summary figures of a deduplication run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub detected_duplicates: usize,
    pub row_count_before: usize,
    pub row_count_after: usize,
    /// Rounded to two decimals
    pub duplicate_percentage: f64,
    /// Mean over blocks of the mean pair similarity, rounded to two
    /// decimals; `None` when no pair was compared
    pub average_similarity_per_block: Option<f64>,
}

/// Output of the evaluation stage
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub deduplicated: Table,
    pub matches: Vec<MatchedRow>,
    pub statistics: Statistics,
}

impl Evaluation {
    pub fn matches_to_json(&self) -> Vec<Value> {
        self.matches.iter().map(MatchedRow::to_json).collect()
    }

    /// All three views under `evaluated_data`, `matches` and `statistics`
    pub fn to_json(&self) -> Value {
        json!({
            "evaluated_data": self.deduplicated.to_json_records(),
            "matches": self.matches_to_json(),
            "statistics": self.statistics,
        })
    }
}

/// Evaluation stage
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator;

impl Evaluator {
    pub fn new() -> Self {
        Self
    }

    /// Apply the `Match` decisions of `classified` to `source`
    ///
    /// Each match keeps `row1` and drops `row2`; a record matched as `row2`
    /// several times is dropped once.
    pub fn evaluate(&self, source: &Table, classified: &ClassifiedPairs) -> Result<Evaluation> {
        let before = source.len();
        if before == 0 {
            return Err(Error::EmptyDataset("duplicate percentage"));
        }

        let by_id: AHashMap<RecordId, &Record> =
            source.records().iter().map(|r| (r.id, r)).collect();
        let find = |id: RecordId| -> Result<Record> {
            by_id
                .get(&id)
                .map(|r| (*r).clone())
                .ok_or(Error::UnknownRecord(id))
        };

        let mut matches = Vec::new();
        let mut dropped: AHashSet<RecordId> = AHashSet::new();
        for (index, pair) in classified.matches().enumerate() {
            let dedup_id = index + 1;
            matches.push(MatchedRow {
                dedup_id,
                dropped: false,
                record: find(pair.pair.row1)?,
            });
            matches.push(MatchedRow {
                dedup_id,
                dropped: true,
                record: find(pair.pair.row2)?,
            });
            dropped.insert(pair.pair.row2);
        }

        let deduplicated = source.without_ids(&dropped);
        let after = deduplicated.len();
        let detected = before - after;

        let statistics = Statistics {
            detected_duplicates: detected,
            row_count_before: before,
            row_count_after: after,
            duplicate_percentage: round2(detected as f64 / before as f64 * 100.0),
            average_similarity_per_block: average_per_block(classified).map(round2),
        };

        info!(
            "Evaluation: {} -> {} records, {} duplicates ({}%)",
            before, after, detected, statistics.duplicate_percentage
        );

        Ok(Evaluation {
            deduplicated,
            matches,
            statistics,
        })
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Mean of the per-block means of pair similarity
fn average_per_block(classified: &ClassifiedPairs) -> Option<f64> {
    let mut blocks: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
    for pair in classified.pairs() {
        let entry = blocks.entry(pair.pair.block_id).or_insert((0.0, 0));
        entry.0 += pair.similarity();
        entry.1 += 1;
    }
    if blocks.is_empty() {
        return None;
    }
    let total: f64 = blocks.values().map(|(sum, n)| sum / *n as f64).sum();
    Some(total / blocks.len() as f64)
}
