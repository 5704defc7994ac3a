//! Exact duplicate detection over a subset of columns
//!
//! Rows count as duplicates when every selected column holds an identical
//! value. The first occurrence is kept.

use ahash::AHashSet;
use serde_json::Value;
use tracing::debug;

use crate::record::Record;

/// Statistics for exact deduplication
#[derive(Debug, Clone, Default)]
pub struct DedupStats {
    /// Total number of records seen
    pub total_seen: usize,
    /// Number of duplicates found
    pub duplicates_found: usize,
    /// Number of unique records
    pub unique_count: usize,
}

impl DedupStats {
    /// Get the deduplication rate as a percentage
    pub fn dedup_rate(&self) -> f64 {
        if self.total_seen == 0 {
            0.0
        } else {
            (self.duplicates_found as f64 / self.total_seen as f64) * 100.0
        }
    }
}

/// Exact deduplicator keyed on the values of selected columns
pub struct ExactDeduplicator {
    /// Columns that make up the duplicate key
    columns: Vec<String>,
    /// Serialized keys seen so far
    seen_keys: AHashSet<String>,
    /// Statistics
    stats: DedupStats,
}

impl ExactDeduplicator {
    /// Create a deduplicator comparing the given columns
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            seen_keys: AHashSet::new(),
            stats: DedupStats::default(),
        }
    }

    /// Build the duplicate key of a record
    ///
    /// The key is the JSON text of the selected values, so two keys are equal
    /// exactly when the values are equal.
    fn key(&self, record: &Record) -> String {
        let values: Vec<Value> = self
            .columns
            .iter()
            .map(|c| record.value(c).clone())
            .collect();
        Value::Array(values).to_string()
    }

    /// Check if a record duplicates one seen before
    ///
    /// Returns `true` if this is a duplicate, `false` if unique.
    pub fn is_duplicate(&mut self, record: &Record) -> bool {
        self.stats.total_seen += 1;

        let key = self.key(record);
        if self.seen_keys.insert(key) {
            self.stats.unique_count += 1;
            false
        } else {
            debug!("Record {} is an exact duplicate", record.id);
            self.stats.duplicates_found += 1;
            true
        }
    }

    /// Keep the first occurrence of every key, preserving order
    pub fn dedup(&mut self, records: Vec<Record>) -> Vec<Record> {
        records
            .into_iter()
            .filter(|r| !self.is_duplicate(r))
            .collect()
    }

    /// Get current statistics
    pub fn stats(&self) -> &DedupStats {
        &self.stats
    }
}
