//! Match classification of scored candidate pairs
//!
//! Every method first attaches the full field values of both records to each
//! pair, then derives a score and a [`Label`]:
//!
//! - `threshold`: mean similarity against one or two thresholds
//! - `weighted-threshold`: weighted sum, min-max normalized over all pairs
//! - `cost-based`: compares the expected cost of declaring a match against
//!   declaring a non-match, using the mean similarity as match probability

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};

use crate::blocking::BlockedTable;
use crate::comparison::{pair_fields, similarity_column, CandidatePair, ComparisonTable};
use crate::pipeline::StepSummary;
use crate::record::{Record, RecordId};
use crate::{Error, Result};

const STAGE: &str = "classification";

/// Classification parameters as they appear in a pipeline config
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationConfig {
    /// `threshold`, `weighted-threshold` or `cost-based`
    pub classification_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_match: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_not_match: Option<f64>,
    #[serde(default)]
    pub possible_match: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_weights: Option<BTreeMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_true_match_as_non_match: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_true_non_match_as_non_match: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_true_match_as_match: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_true_non_match_as_match: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability_m: Option<f64>,
}

impl ClassificationConfig {
    /// Resolve the method, checking every parameter it needs
    pub fn method(&self) -> Result<ClassificationMethod> {
        match self.classification_type.as_str() {
            "threshold" => {
                let match_threshold = unit(self.threshold_match, "thresholdMatch")?;
                let not_match_threshold = if self.possible_match {
                    let not_match = unit(self.threshold_not_match, "thresholdNotMatch")?;
                    if not_match > match_threshold {
                        return Err(Error::InvalidParameter {
                            stage: STAGE,
                            parameter: "thresholdNotMatch",
                            reason: format!(
                                "{not_match} exceeds thresholdMatch {match_threshold}"
                            ),
                        });
                    }
                    Some(not_match)
                } else {
                    None
                };
                Ok(ClassificationMethod::Threshold {
                    match_threshold,
                    not_match_threshold,
                })
            }
            "weighted-threshold" => {
                let match_threshold = unit(self.threshold_match, "thresholdMatch")?;
                let weights = self
                    .column_weights
                    .clone()
                    .ok_or(Error::MissingParameter {
                        stage: STAGE,
                        parameter: "columnWeights",
                    })?;
                if weights.is_empty() {
                    return Err(Error::InvalidParameter {
                        stage: STAGE,
                        parameter: "columnWeights",
                        reason: "at least one weight is required".to_string(),
                    });
                }
                Ok(ClassificationMethod::Weighted {
                    match_threshold,
                    weights,
                })
            }
            "cost-based" => Ok(ClassificationMethod::CostBased {
                costs: CostMatrix {
                    true_match_as_non_match: required(
                        self.cost_true_match_as_non_match,
                        "costTrueMatchAsNonMatch",
                    )?,
                    true_non_match_as_non_match: required(
                        self.cost_true_non_match_as_non_match,
                        "costTrueNonMatchAsNonMatch",
                    )?,
                    true_match_as_match: required(
                        self.cost_true_match_as_match,
                        "costTrueMatchAsMatch",
                    )?,
                    true_non_match_as_match: required(
                        self.cost_true_non_match_as_match,
                        "costTrueNonMatchAsMatch",
                    )?,
                },
                probability_m: unit(self.probability_m, "probabilityM")?,
            }),
            other => Err(Error::UnknownAlgorithm {
                kind: "classification method",
                name: other.to_string(),
            }),
        }
    }
}

fn required(value: Option<f64>, parameter: &'static str) -> Result<f64> {
    match value {
        None => Err(Error::MissingParameter {
            stage: STAGE,
            parameter,
        }),
        Some(v) if !v.is_finite() => Err(Error::InvalidParameter {
            stage: STAGE,
            parameter,
            reason: "must be a finite number".to_string(),
        }),
        Some(v) => Ok(v),
    }
}

fn unit(value: Option<f64>, parameter: &'static str) -> Result<f64> {
    let v = required(value, parameter)?;
    if !(0.0..=1.0).contains(&v) {
        return Err(Error::InvalidParameter {
            stage: STAGE,
            parameter,
            reason: format!("{v} is outside [0, 1]"),
        });
    }
    Ok(v)
}

/// Misclassification costs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostMatrix {
    pub true_match_as_non_match: f64,
    pub true_non_match_as_non_match: f64,
    pub true_match_as_match: f64,
    pub true_non_match_as_match: f64,
}

/// A validated classification method
#[derive(Debug, Clone, PartialEq)]
pub enum ClassificationMethod {
    Threshold {
        match_threshold: f64,
        /// Set when the possible-match band is enabled
        not_match_threshold: Option<f64>,
    },
    Weighted {
        match_threshold: f64,
        /// Keys as configured: `<column>` or `<column>_similarity`
        weights: BTreeMap<String, f64>,
    },
    CostBased {
        costs: CostMatrix,
        probability_m: f64,
    },
}

impl ClassificationMethod {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Threshold { .. } => "threshold",
            Self::Weighted { .. } => "weighted-threshold",
            Self::CostBased { .. } => "cost-based",
        }
    }
}

/// Decision for one candidate pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    #[serde(rename = "Match")]
    Match,
    #[serde(rename = "Possible Match")]
    PossibleMatch,
    #[serde(rename = "Not Match")]
    NotMatch,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Match => "Match",
            Label::PossibleMatch => "Possible Match",
            Label::NotMatch => "Not Match",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Method-specific scalars derived for a pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DerivedScores {
    Average {
        average_similarity: f64,
    },
    Weighted {
        weighted_similarity: f64,
        normalized_similarity: f64,
    },
    Cost {
        average_similarity: f64,
        cost_match: f64,
        cost_non_match: f64,
    },
}

impl DerivedScores {
    fn insert_into(&self, object: &mut Map<String, Value>) {
        match *self {
            DerivedScores::Average { average_similarity } => {
                object.insert("average_similarity".into(), average_similarity.into());
            }
            DerivedScores::Weighted {
                weighted_similarity,
                normalized_similarity,
            } => {
                object.insert("weighted_similarity".into(), weighted_similarity.into());
                object.insert("normalized_similarity".into(), normalized_similarity.into());
            }
            DerivedScores::Cost {
                average_similarity,
                cost_match,
                cost_non_match,
            } => {
                object.insert("average_similarity".into(), average_similarity.into());
                object.insert("cost_non_match".into(), cost_non_match.into());
                object.insert("cost_match".into(), cost_match.into());
            }
        }
    }
}

/// A candidate pair with both records' attributes and its label
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedPair {
    pub pair: CandidatePair,
    pub row1_fields: Map<String, Value>,
    pub row2_fields: Map<String, Value>,
    pub derived: DerivedScores,
    pub label: Label,
}

impl ClassifiedPair {
    /// Pair similarity used for reporting: normalized for weighted
    /// classification, the mean otherwise
    pub fn similarity(&self) -> f64 {
        match self.derived {
            DerivedScores::Average { average_similarity }
            | DerivedScores::Cost {
                average_similarity, ..
            } => average_similarity,
            DerivedScores::Weighted {
                normalized_similarity,
                ..
            } => normalized_similarity,
        }
    }

    pub fn is_match(&self) -> bool {
        self.label == Label::Match
    }
}

/// Output of the classification stage
#[derive(Debug, Clone)]
pub struct ClassifiedPairs {
    method: ClassificationMethod,
    similarity_columns: Vec<String>,
    columns: Vec<String>,
    pairs: Vec<ClassifiedPair>,
    summary: StepSummary,
}

impl ClassifiedPairs {
    pub fn method(&self) -> &ClassificationMethod {
        &self.method
    }

    pub fn pairs(&self) -> &[ClassifiedPair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Pairs labelled [`Label::Match`], in pair order
    pub fn matches(&self) -> impl Iterator<Item = &ClassifiedPair> {
        self.pairs.iter().filter(|p| p.is_match())
    }

    /// Number of pairs per label
    pub fn label_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for pair in &self.pairs {
            *counts.entry(pair.label.as_str()).or_insert(0) += 1;
        }
        counts
    }

    pub fn summary(&self) -> &StepSummary {
        &self.summary
    }

    /// Records-array form: pair columns, `row1_*`/`row2_*` attributes,
    /// derived scores and `classification`
    pub fn to_json_records(&self) -> Vec<Value> {
        self.pairs
            .iter()
            .map(|classified| {
                let mut object = pair_fields(&classified.pair, &self.similarity_columns);
                for column in &self.columns {
                    for (prefix, fields) in [
                        ("row1", &classified.row1_fields),
                        ("row2", &classified.row2_fields),
                    ] {
                        object.insert(
                            format!("{prefix}_{column}"),
                            fields.get(column).cloned().unwrap_or(Value::Null),
                        );
                    }
                }
                classified.derived.insert_into(&mut object);
                object.insert(
                    "classification".to_string(),
                    Value::from(classified.label.as_str()),
                );
                Value::Object(object)
            })
            .collect()
    }
}

/// Classification stage
#[derive(Debug, Clone)]
pub struct Classifier {
    config: ClassificationConfig,
    method: ClassificationMethod,
}

impl Classifier {
    pub fn new(config: &ClassificationConfig) -> Result<Self> {
        Ok(Self {
            method: config.method()?,
            config: config.clone(),
        })
    }

    pub fn method(&self) -> &ClassificationMethod {
        &self.method
    }

    /// Label every pair of `comparisons`, resolving attributes from `blocked`
    pub fn classify(
        &self,
        comparisons: &ComparisonTable,
        blocked: &BlockedTable,
    ) -> Result<ClassifiedPairs> {
        info!(
            "Classifying {} pairs using {}",
            comparisons.len(),
            self.method.name()
        );

        let records: AHashMap<RecordId, &Record> = blocked
            .records()
            .iter()
            .map(|r| (r.record.id, &r.record))
            .collect();
        let lookup = |id: RecordId| -> Result<Map<String, Value>> {
            records
                .get(&id)
                .map(|r| r.fields.clone())
                .ok_or(Error::UnknownRecord(id))
        };

        let derived = self.derive(comparisons)?;
        let mut pairs = Vec::with_capacity(comparisons.len());
        for (pair, (derived, label)) in comparisons.pairs().iter().zip(derived) {
            pairs.push(ClassifiedPair {
                row1_fields: lookup(pair.row1)?,
                row2_fields: lookup(pair.row2)?,
                pair: pair.clone(),
                derived,
                label,
            });
        }

        let result = ClassifiedPairs {
            method: self.method.clone(),
            similarity_columns: comparisons.similarity_columns(),
            columns: blocked.columns().to_vec(),
            pairs,
            summary: StepSummary::new(
                "classification",
                self.method.name(),
                serde_json::to_value(&self.config).unwrap_or(Value::Null),
            ),
        };
        info!("Classification done: {:?}", result.label_counts());
        Ok(result)
    }

    fn derive(&self, comparisons: &ComparisonTable) -> Result<Vec<(DerivedScores, Label)>> {
        let pairs = comparisons.pairs();
        match &self.method {
            ClassificationMethod::Threshold {
                match_threshold,
                not_match_threshold,
            } => Ok(pairs
                .iter()
                .map(|pair| {
                    let average_similarity = average(&pair.scores);
                    let label =
                        threshold_label(average_similarity, *match_threshold, *not_match_threshold);
                    (DerivedScores::Average { average_similarity }, label)
                })
                .collect()),
            ClassificationMethod::Weighted {
                match_threshold,
                weights,
            } => {
                let weights = resolve_weights(weights, comparisons.columns())?;
                let weighted: Vec<f64> = pairs
                    .iter()
                    .map(|pair| weights.iter().map(|(i, w)| w * pair.scores[*i]).sum())
                    .collect();
                let min = weighted.iter().copied().fold(f64::INFINITY, f64::min);
                let max = weighted.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                debug!("Weighted similarity range [{}, {}]", min, max);

                Ok(weighted
                    .into_iter()
                    .map(|weighted_similarity| {
                        let normalized_similarity = if max > min {
                            (weighted_similarity - min) / (max - min)
                        } else {
                            0.0
                        };
                        let label = if normalized_similarity >= *match_threshold {
                            Label::Match
                        } else {
                            Label::NotMatch
                        };
                        (
                            DerivedScores::Weighted {
                                weighted_similarity,
                                normalized_similarity,
                            },
                            label,
                        )
                    })
                    .collect())
            }
            ClassificationMethod::CostBased {
                costs,
                probability_m,
            } => Ok(pairs
                .iter()
                .map(|pair| {
                    let average_similarity = average(&pair.scores);
                    let (cost_match, cost_non_match) =
                        expected_costs(average_similarity, costs, *probability_m);
                    let label = if cost_match < cost_non_match {
                        Label::Match
                    } else {
                        Label::NotMatch
                    };
                    (
                        DerivedScores::Cost {
                            average_similarity,
                            cost_match,
                            cost_non_match,
                        },
                        label,
                    )
                })
                .collect()),
        }
    }
}

fn average(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().sum::<f64>() / scores.len() as f64
}

fn threshold_label(average: f64, match_threshold: f64, not_match_threshold: Option<f64>) -> Label {
    if average >= match_threshold {
        Label::Match
    } else {
        match not_match_threshold {
            Some(not_match) if average >= not_match => Label::PossibleMatch,
            _ => Label::NotMatch,
        }
    }
}

/// `(cost_match, cost_non_match)` with `avg` standing in for P(match)
fn expected_costs(avg: f64, costs: &CostMatrix, probability_m: f64) -> (f64, f64) {
    let probability_u = 1.0 - probability_m;
    let cost_non_match = costs.true_match_as_non_match * avg * probability_m
        + costs.true_non_match_as_non_match * (1.0 - avg) * probability_u;
    let cost_match = costs.true_match_as_match * avg * probability_m
        + costs.true_non_match_as_match * (1.0 - avg) * probability_u;
    (cost_match, cost_non_match)
}

/// Map weight keys onto score indices
fn resolve_weights(weights: &BTreeMap<String, f64>, columns: &[String]) -> Result<Vec<(usize, f64)>> {
    weights
        .iter()
        .map(|(key, weight)| {
            columns
                .iter()
                .position(|c| c == key || similarity_column(c) == *key)
                .map(|index| (index, *weight))
                .ok_or_else(|| Error::UnknownWeightColumn(key.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocking::{BlockBuilder, BlockingConfig};
    use crate::record::Table;
    use serde_json::json;

    fn blocked() -> BlockedTable {
        let table = Table::from_json_records(vec![
            json!({"ID": 0, "k": "x", "name": "anna"}),
            json!({"ID": 1, "k": "x", "name": "ana"}),
            json!({"ID": 2, "k": "x", "name": "hanna"}),
            json!({"ID": 3, "k": "x", "name": "bob"}),
        ])
        .unwrap();
        let config = BlockingConfig {
            algorithm: "standardBlocking".to_string(),
            columns: vec!["k".to_string()],
            window_size: None,
            n_letters: None,
            max_window_size: None,
            threshold: None,
        };
        BlockBuilder::new(&config).unwrap().build(&table).unwrap()
    }

    fn comparisons(scores: &[(i64, i64, [f64; 2])]) -> ComparisonTable {
        let pairs = scores
            .iter()
            .map(|(row1, row2, s)| CandidatePair {
                block_id: 1,
                row1: RecordId(*row1),
                row2: RecordId(*row2),
                scores: s.to_vec(),
            })
            .collect();
        ComparisonTable::new(
            vec!["name".to_string(), "k".to_string()],
            pairs,
            StepSummary::new("comparison", "test", Value::Null),
        )
    }

    fn threshold(match_threshold: f64, not_match: Option<f64>) -> ClassificationConfig {
        ClassificationConfig {
            classification_type: "threshold".to_string(),
            threshold_match: Some(match_threshold),
            threshold_not_match: not_match,
            possible_match: not_match.is_some(),
            ..Default::default()
        }
    }

    fn labels(classified: &ClassifiedPairs) -> Vec<Label> {
        classified.pairs().iter().map(|p| p.label).collect()
    }

    #[test]
    fn test_threshold_binary() {
        let table = comparisons(&[(0, 1, [0.9, 0.5]), (0, 2, [0.5, 0.4]), (0, 3, [0.0, 0.2])]);
        let classified = Classifier::new(&threshold(0.6, None))
            .unwrap()
            .classify(&table, &blocked())
            .unwrap();

        assert_eq!(labels(&classified), vec![Label::Match, Label::NotMatch, Label::NotMatch]);
        assert!((classified.pairs()[0].similarity() - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_threshold_possible_match() {
        let table = comparisons(&[(0, 1, [0.9, 0.5]), (0, 2, [0.5, 0.4]), (0, 3, [0.0, 0.2])]);
        let classified = Classifier::new(&threshold(0.6, Some(0.3)))
            .unwrap()
            .classify(&table, &blocked())
            .unwrap();

        assert_eq!(
            labels(&classified),
            vec![Label::Match, Label::PossibleMatch, Label::NotMatch]
        );
        assert_eq!(classified.label_counts()["Possible Match"], 1);
    }

    #[test]
    fn test_threshold_monotonic() {
        for avg in [0.5, 0.51, 0.75, 1.0] {
            for split in [[avg, avg], [avg * 2.0 - 0.5, 0.5], [1.0, avg * 2.0 - 1.0]] {
                if split.iter().any(|s| !(0.0..=1.0).contains(s)) {
                    continue;
                }
                let label = threshold_label(average(&split), 0.5, Some(0.2));
                assert_eq!(label, Label::Match, "{split:?}");
            }
        }
    }

    #[test]
    fn test_weighted() {
        let table = comparisons(&[(0, 1, [1.0, 0.0]), (0, 2, [0.5, 1.0]), (0, 3, [0.0, 1.0])]);
        let config = ClassificationConfig {
            classification_type: "weighted-threshold".to_string(),
            threshold_match: Some(0.5),
            column_weights: Some(BTreeMap::from([
                ("name".to_string(), 0.8),
                ("k_similarity".to_string(), 0.2),
            ])),
            ..Default::default()
        };
        let classified = Classifier::new(&config)
            .unwrap()
            .classify(&table, &blocked())
            .unwrap();

        // weighted: 0.8, 0.6, 0.2 -> normalized 1.0, 0.666.., 0.0
        let normalized: Vec<f64> = classified.pairs().iter().map(|p| p.similarity()).collect();
        assert!((normalized[0] - 1.0).abs() < 1e-12);
        assert!((normalized[1] - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(normalized[2], 0.0);
        assert_eq!(labels(&classified), vec![Label::Match, Label::Match, Label::NotMatch]);
    }

    #[test]
    fn test_weighted_constant_scores() {
        let table = comparisons(&[(0, 1, [0.7, 0.7]), (0, 2, [0.7, 0.7])]);
        let config = ClassificationConfig {
            classification_type: "weighted-threshold".to_string(),
            threshold_match: Some(0.5),
            column_weights: Some(BTreeMap::from([("name".to_string(), 1.0)])),
            ..Default::default()
        };
        let classified = Classifier::new(&config)
            .unwrap()
            .classify(&table, &blocked())
            .unwrap();

        assert!(classified.pairs().iter().all(|p| p.similarity() == 0.0));
        assert_eq!(classified.matches().count(), 0);
    }

    #[test]
    fn test_weighted_unknown_column() {
        let config = ClassificationConfig {
            classification_type: "weighted-threshold".to_string(),
            threshold_match: Some(0.5),
            column_weights: Some(BTreeMap::from([("email".to_string(), 1.0)])),
            ..Default::default()
        };
        let err = Classifier::new(&config)
            .unwrap()
            .classify(&comparisons(&[(0, 1, [1.0, 1.0])]), &blocked())
            .unwrap_err();
        assert!(matches!(err, Error::UnknownWeightColumn(ref k) if k == "email"));
    }

    #[test]
    fn test_cost_based() {
        let config = ClassificationConfig {
            classification_type: "cost-based".to_string(),
            cost_true_match_as_non_match: Some(2.0),
            cost_true_non_match_as_non_match: Some(0.0),
            cost_true_match_as_match: Some(0.0),
            cost_true_non_match_as_match: Some(1.0),
            probability_m: Some(0.5),
            ..Default::default()
        };
        let table = comparisons(&[(0, 1, [0.9, 0.9]), (0, 2, [0.1, 0.1])]);
        let classified = Classifier::new(&config)
            .unwrap()
            .classify(&table, &blocked())
            .unwrap();

        assert_eq!(labels(&classified), vec![Label::Match, Label::NotMatch]);
        let DerivedScores::Cost {
            cost_match,
            cost_non_match,
            ..
        } = classified.pairs()[0].derived
        else {
            panic!("expected cost scores");
        };
        assert!((cost_non_match - 0.9).abs() < 1e-12);
        assert!((cost_match - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_cost_based_ties_are_not_matches() {
        let costs = CostMatrix {
            true_match_as_non_match: 1.0,
            true_non_match_as_non_match: 1.0,
            true_match_as_match: 1.0,
            true_non_match_as_match: 1.9,
        };
        let (cost_match, cost_non_match) = expected_costs(1.0, &costs, 0.74);
        assert_eq!(cost_match, cost_non_match);
    }

    #[test]
    fn test_row_attributes_exported() {
        let table = comparisons(&[(1, 2, [0.8, 1.0])]);
        let classified = Classifier::new(&threshold(0.5, None))
            .unwrap()
            .classify(&table, &blocked())
            .unwrap();

        let row = &classified.to_json_records()[0];
        assert_eq!(row["row1"], 1);
        assert_eq!(row["row1_name"], "ana");
        assert_eq!(row["row2_name"], "hanna");
        assert_eq!(row["average_similarity"], 0.9);
        assert_eq!(row["classification"], "Match");
        assert!(row.get("row1_block_id").is_none());
        assert!(row.get("row1_BKV").is_none());
        assert!(row.get("row1_ID").is_none());
    }

    #[test]
    fn test_unknown_record() {
        let table = comparisons(&[(0, 99, [1.0, 1.0])]);
        let err = Classifier::new(&threshold(0.5, None))
            .unwrap()
            .classify(&table, &blocked())
            .unwrap_err();
        assert!(matches!(err, Error::UnknownRecord(RecordId(99))));
    }

    #[test]
    fn test_config_errors() {
        let missing = ClassificationConfig {
            classification_type: "threshold".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            Classifier::new(&missing).unwrap_err(),
            Error::MissingParameter {
                parameter: "thresholdMatch",
                ..
            }
        ));

        let inverted = ClassificationConfig {
            possible_match: true,
            threshold_not_match: Some(0.8),
            ..threshold(0.5, None)
        };
        assert!(Classifier::new(&inverted).unwrap_err().is_configuration());

        let no_weights = ClassificationConfig {
            classification_type: "weighted-threshold".to_string(),
            threshold_match: Some(0.5),
            ..Default::default()
        };
        assert!(Classifier::new(&no_weights).unwrap_err().is_configuration());

        let no_costs = ClassificationConfig {
            classification_type: "cost-based".to_string(),
            probability_m: Some(0.5),
            ..Default::default()
        };
        assert!(Classifier::new(&no_costs).unwrap_err().is_configuration());

        let unknown = ClassificationConfig {
            classification_type: "random-forest".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            Classifier::new(&unknown).unwrap_err(),
            Error::UnknownAlgorithm { .. }
        ));
    }

    #[test]
    fn test_config_from_json() {
        let config: ClassificationConfig = serde_json::from_value(json!({
            "classificationType": "cost-based",
            "costTrueMatchAsNonMatch": 1,
            "costTrueNonMatchAsNonMatch": 1,
            "costTrueMatchAsMatch": 1,
            "costTrueNonMatchAsMatch": 1.9,
            "probabilityM": 0.74
        }))
        .unwrap();

        assert_eq!(config.method().unwrap().name(), "cost-based");
    }

    #[test]
    fn test_label_serde() {
        assert_eq!(serde_json::to_value(Label::PossibleMatch).unwrap(), "Possible Match");
        assert_eq!(Label::NotMatch.to_string(), "Not Match");
    }
}
