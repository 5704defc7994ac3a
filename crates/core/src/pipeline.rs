//! Pipeline orchestration
//!
//! Threads one table through preprocessing, block building, comparison,
//! classification and evaluation. Each stage receives exactly the output it
//! needs from its predecessors; nothing is shared between runs.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::blocking::{BlockBuilder, BlockedTable, BlockingConfig};
use crate::classifier::{ClassificationConfig, ClassifiedPairs, Classifier};
use crate::comparison::{ComparisonConfig, ComparisonTable, PairComparator};
use crate::evaluation::{Evaluation, Evaluator};
use crate::preprocess::{PreprocessConfig, Preprocessed, Preprocessor};
use crate::record::{RecordId, Table};
use crate::{Error, Result};

/// Method and effective parameters a stage ran with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSummary {
    pub step: String,
    pub method: String,
    pub parameters: Value,
}

impl StepSummary {
    pub fn new(step: impl Into<String>, method: impl Into<String>, parameters: Value) -> Self {
        Self {
            step: step.into(),
            method: method.into(),
            parameters,
        }
    }
}

/// Parameters of every stage; preprocessing is optional
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preprocessing: Option<PreprocessConfig>,
    pub blocking: BlockingConfig,
    pub comparison: ComparisonConfig,
    pub classification: ClassificationConfig,
}

impl PipelineConfig {
    /// Check every stage configuration without touching data
    pub fn validate(&self) -> Result<()> {
        Pipeline::new(self).map(|_| ())
    }
}

/// Pipeline statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineStats {
    pub total_records: usize,
    pub exact_duplicates: usize,
    pub blocks: usize,
    pub candidate_pairs: usize,
    pub matches: usize,
    pub detected_duplicates: usize,
    pub unique_records: usize,
}

impl PipelineStats {
    pub fn deduplication_rate(&self) -> f64 {
        let total_dups = self.exact_duplicates + self.detected_duplicates;
        if self.total_records > 0 {
            (total_dups as f64 / self.total_records as f64) * 100.0
        } else {
            0.0
        }
    }

    pub fn retention_rate(&self) -> f64 {
        if self.total_records > 0 {
            (self.unique_records as f64 / self.total_records as f64) * 100.0
        } else {
            0.0
        }
    }
}

/// Typed output of every stage of one run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub preprocessed: Option<Preprocessed>,
    pub blocked: BlockedTable,
    pub comparisons: ComparisonTable,
    pub classified: ClassifiedPairs,
    pub evaluation: Evaluation,
    total_records: usize,
}

impl PipelineOutput {
    /// Method and parameters of each stage that ran, in order
    pub fn steps(&self) -> Vec<StepSummary> {
        let mut steps = Vec::with_capacity(4);
        if let Some(preprocessed) = &self.preprocessed {
            steps.push(preprocessed.summary.clone());
        }
        steps.push(self.blocked.summary().clone());
        steps.push(self.comparisons.summary().clone());
        steps.push(self.classified.summary().clone());
        steps
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            total_records: self.total_records,
            exact_duplicates: self
                .preprocessed
                .as_ref()
                .map_or(0, |p| p.removed_duplicates),
            blocks: self.blocked.num_blocks(),
            candidate_pairs: self.comparisons.len(),
            matches: self.classified.matches().count(),
            detected_duplicates: self.evaluation.statistics.detected_duplicates,
            unique_records: self.evaluation.deduplicated.len(),
        }
    }
}

/// Pipeline stage names, reported before each stage starts
pub mod stage {
    pub const PREPROCESSING: &str = "preprocessing";
    pub const BLOCK_BUILDING: &str = "block building";
    pub const COMPARISON: &str = "comparison";
    pub const CLASSIFICATION: &str = "classification";
    pub const EVALUATION: &str = "evaluation";
}

/// Entity-resolution pipeline
#[derive(Debug, Clone)]
pub struct Pipeline {
    preprocessor: Option<Preprocessor>,
    block_builder: BlockBuilder,
    comparator: PairComparator,
    classifier: Classifier,
    evaluator: Evaluator,
}

impl Pipeline {
    /// Create a new pipeline, validating every stage configuration
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        Ok(Self {
            preprocessor: config
                .preprocessing
                .clone()
                .map(Preprocessor::new)
                .transpose()?,
            block_builder: BlockBuilder::new(&config.blocking)?,
            comparator: PairComparator::new(&config.comparison)?,
            classifier: Classifier::new(&config.classification)?,
            evaluator: Evaluator::new(),
        })
    }

    pub fn run(&self, table: &Table) -> Result<PipelineOutput> {
        self.run_with(table, |_| {})
    }

    /// Run every stage, calling `on_stage` with the name of each stage
    /// before it starts
    pub fn run_with(
        &self,
        table: &Table,
        mut on_stage: impl FnMut(&'static str),
    ) -> Result<PipelineOutput> {
        if table.is_empty() {
            return Err(Error::EmptyDataset("duplicate percentage"));
        }
        info!("Running pipeline on {} records", table.len());

        let preprocessed = match &self.preprocessor {
            Some(preprocessor) => {
                on_stage(stage::PREPROCESSING);
                Some(preprocessor.run(table)?)
            }
            None => None,
        };
        let working = preprocessed.as_ref().map_or(table, |p| &p.table);

        on_stage(stage::BLOCK_BUILDING);
        let blocked = self.block_builder.build(working)?;

        on_stage(stage::COMPARISON);
        let comparisons = self.comparator.compare(&blocked)?;

        on_stage(stage::CLASSIFICATION);
        let classified = self.classifier.classify(&comparisons, &blocked)?;

        // Evaluate against the caller's raw records that survived preprocessing
        on_stage(stage::EVALUATION);
        let source = match &preprocessed {
            Some(p) if p.removed_duplicates > 0 => {
                let kept = p.table.ids().into_iter().collect();
                debug!("Evaluating {} of {} source records", p.table.len(), table.len());
                table.retain_ids(&kept)
            }
            _ => table.clone(),
        };
        let evaluation = self.evaluator.evaluate(&source, &classified)?;

        info!(
            "Pipeline finished: {} -> {} records",
            table.len(),
            evaluation.deduplicated.len()
        );

        Ok(PipelineOutput {
            preprocessed,
            blocked,
            comparisons,
            classified,
            evaluation,
            total_records: table.len(),
        })
    }

    /// IDs a run would keep, without the intermediate tables
    pub fn deduplicate(&self, table: &Table) -> Result<Vec<RecordId>> {
        Ok(self.run(table)?.evaluation.deduplicated.ids())
    }
}

/// Builder for pipeline configuration
pub struct PipelineBuilder {
    preprocessing: Option<PreprocessConfig>,
    blocking: Option<BlockingConfig>,
    comparison: Option<ComparisonConfig>,
    classification: Option<ClassificationConfig>,
    num_threads: Option<usize>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            preprocessing: None,
            blocking: None,
            comparison: None,
            classification: None,
            num_threads: None,
        }
    }

    pub fn preprocessing(mut self, config: PreprocessConfig) -> Self {
        self.preprocessing = Some(config);
        self
    }

    pub fn blocking(mut self, config: BlockingConfig) -> Self {
        self.blocking = Some(config);
        self
    }

    pub fn comparison(mut self, config: ComparisonConfig) -> Self {
        self.comparison = Some(config);
        self
    }

    pub fn classification(mut self, config: ClassificationConfig) -> Self {
        self.classification = Some(config);
        self
    }

    /// Size of the global rayon pool used for block comparison
    pub fn num_threads(mut self, threads: usize) -> Self {
        self.num_threads = Some(threads);
        self
    }

    pub fn build(self) -> Result<Pipeline> {
        if let Some(num_threads) = self.num_threads {
            // Only the first pool configuration in a process takes effect
            rayon::ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .build_global()
                .ok();
        }

        let config = PipelineConfig {
            preprocessing: self.preprocessing,
            blocking: self.blocking.ok_or(Error::MissingParameter {
                stage: "pipeline",
                parameter: "blocking",
            })?,
            comparison: self.comparison.ok_or(Error::MissingParameter {
                stage: "pipeline",
                parameter: "comparison",
            })?,
            classification: self.classification.ok_or(Error::MissingParameter {
                stage: "pipeline",
                parameter: "classification",
            })?,
        };
        Pipeline::new(&config)
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> PipelineConfig {
        serde_json::from_value(json!({
            "preprocessing": {
                "columns": ["all"],
                "lowercase": true,
                "removeDiacritics": true,
                "removePunctuation": true
            },
            "blocking": {"algorithm": "standardBlocking", "columns": ["city"]},
            "comparison": {"selectedAlgorithms": {"name": "Levenshtein"}},
            "classification": {"classificationType": "threshold", "thresholdMatch": 0.8}
        }))
        .unwrap()
    }

    fn people() -> Table {
        Table::from_json_records(vec![
            json!({"ID": 0, "name": "Jörg Müller", "city": "Berlin"}),
            json!({"ID": 1, "name": "jorg muller", "city": "berlin"}),
            json!({"ID": 2, "name": "Jorg Mueller", "city": "Berlin"}),
            json!({"ID": 3, "name": "Anna Schmidt", "city": "Hamburg"}),
            json!({"ID": 4, "name": "Anna Schmid", "city": "Hamburg"}),
            json!({"ID": 5, "name": "Peter Braun", "city": "Hamburg"}),
        ])
        .unwrap()
    }

    #[test]
    fn test_run() {
        let pipeline = Pipeline::new(&config()).unwrap();
        let output = pipeline.run(&people()).unwrap();

        // Row 1 equals row 0 once normalized
        assert_eq!(output.preprocessed.as_ref().unwrap().removed_duplicates, 1);
        assert_eq!(
            output.evaluation.deduplicated.ids(),
            vec![RecordId(0), RecordId(3), RecordId(5)]
        );
        // Evaluated rows keep their raw values
        assert_eq!(
            output.evaluation.deduplicated.records()[0].value("name"),
            &json!("Jörg Müller")
        );

        let stats = output.stats();
        assert_eq!(stats.total_records, 6);
        assert_eq!(stats.exact_duplicates, 1);
        assert_eq!(stats.blocks, 2);
        assert_eq!(stats.candidate_pairs, 4);
        assert_eq!(stats.detected_duplicates, 2);
        assert_eq!(stats.unique_records, 3);
        assert_eq!(stats.deduplication_rate(), 50.0);
        assert_eq!(stats.retention_rate(), 50.0);
    }

    #[test]
    fn test_steps() {
        let output = Pipeline::new(&config()).unwrap().run(&people()).unwrap();
        let steps: Vec<(String, String)> = output
            .steps()
            .into_iter()
            .map(|s| (s.step, s.method))
            .collect();

        assert_eq!(
            steps,
            vec![
                ("data_preprocessing".to_string(), "text_normalization".to_string()),
                ("block_building".to_string(), "standardBlocking".to_string()),
                ("comparison".to_string(), "Levenshtein".to_string()),
                ("classification".to_string(), "threshold".to_string()),
            ]
        );
    }

    #[test]
    fn test_stage_callback_order() {
        let mut seen = Vec::new();
        Pipeline::new(&config())
            .unwrap()
            .run_with(&people(), |s| seen.push(s))
            .unwrap();

        assert_eq!(
            seen,
            vec![
                stage::PREPROCESSING,
                stage::BLOCK_BUILDING,
                stage::COMPARISON,
                stage::CLASSIFICATION,
                stage::EVALUATION
            ]
        );
    }

    #[test]
    fn test_without_preprocessing() {
        let mut cfg = config();
        cfg.preprocessing = None;
        let output = Pipeline::new(&cfg).unwrap().run(&people()).unwrap();

        assert!(output.preprocessed.is_none());
        assert_eq!(output.steps().len(), 3);
        // "Berlin" and "berlin" share a Soundex code
        assert_eq!(output.blocked.num_blocks(), 2);
    }

    #[test]
    fn test_builder() {
        let cfg = config();
        let pipeline = PipelineBuilder::new()
            .blocking(cfg.blocking.clone())
            .comparison(cfg.comparison.clone())
            .classification(cfg.classification.clone())
            .build()
            .unwrap();
        let ids = pipeline.deduplicate(&people()).unwrap();
        assert_eq!(ids.first(), Some(&RecordId(0)));

        let err = PipelineBuilder::new()
            .blocking(cfg.blocking)
            .build()
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_invalid_config_fails_before_running() {
        let mut cfg = config();
        cfg.blocking.algorithm = "sortedNeighborhood".to_string();
        assert!(matches!(
            cfg.validate().unwrap_err(),
            Error::MissingParameter {
                parameter: "windowSize",
                ..
            }
        ));
    }

    #[test]
    fn test_empty_table_is_data_error() {
        let mut stages = Vec::new();
        let err = Pipeline::new(&config())
            .unwrap()
            .run_with(&Table::from_json_records(vec![]).unwrap(), |s| stages.push(s))
            .unwrap_err();
        assert!(matches!(err, Error::EmptyDataset(_)));
        assert!(err.is_data());
        // Rejected before any stage starts
        assert!(stages.is_empty());
    }
}
