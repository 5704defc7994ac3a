//! String similarity metrics, all normalized to `[0, 1]`
//!
//! Every metric returns 0 when either side is missing or empty.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Field similarity metric selectable per column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SimilarityMetric {
    #[serde(rename = "Levenshtein")]
    Levenshtein,
    #[serde(rename = "Jaro-Winkler")]
    JaroWinkler,
    #[serde(rename = "Q-gram")]
    QGram,
}

impl SimilarityMetric {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Levenshtein => "Levenshtein",
            Self::JaroWinkler => "Jaro-Winkler",
            Self::QGram => "Q-gram",
        }
    }

    /// Score two raw field values; `q` only applies to the Q-gram metric
    pub fn score(&self, a: &Value, b: &Value, q: usize) -> f64 {
        let (Some(a), Some(b)) = (field_text(a), field_text(b)) else {
            return 0.0;
        };
        match self {
            Self::Levenshtein => levenshtein(&a, &b),
            Self::JaroWinkler => jaro_winkler(&a, &b),
            Self::QGram => qgram(&a, &b, q),
        }
    }
}

impl fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SimilarityMetric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Levenshtein" => Ok(Self::Levenshtein),
            "Jaro-Winkler" => Ok(Self::JaroWinkler),
            "Q-gram" => Ok(Self::QGram),
            other => Err(Error::UnknownAlgorithm {
                kind: "similarity metric",
                name: other.to_string(),
            }),
        }
    }
}

/// Text of a field value, `None` for null and empty strings
pub fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn clamp(score: f64) -> f64 {
    score.clamp(0.0, 1.0)
}

/// `1 - edit_distance / max(len_a, len_b)`
pub fn levenshtein(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    clamp(strsim::normalized_levenshtein(a, b))
}

/// Standard Jaro-Winkler similarity (prefix scale 0.1, prefix up to 4)
pub fn jaro_winkler(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    clamp(strsim::jaro_winkler(a, b))
}

/// Distinct character q-grams of a string
///
/// A string shorter than `q` contributes itself as its only gram, so short
/// identical values still compare as equal.
fn qgrams(s: &str, q: usize) -> AHashSet<String> {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() < q {
        return std::iter::once(s.to_string()).collect();
    }
    chars.windows(q).map(|w| w.iter().collect()).collect()
}

/// `|shared q-grams| / |union of q-grams|`
pub fn qgram(a: &str, b: &str, q: usize) -> f64 {
    if a.is_empty() || b.is_empty() || q == 0 {
        return 0.0;
    }
    let grams_a = qgrams(a, q);
    let grams_b = qgrams(b, q);
    let shared = grams_a.intersection(&grams_b).count();
    let union = grams_a.union(&grams_b).count();
    if union == 0 {
        return 0.0;
    }
    clamp(shared as f64 / union as f64)
}

/// Length of the longest common subsequence, in characters
fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Indel similarity ratio on a 0-100 scale, rounded to an integer
///
/// `100 * 2 * lcs / (len_a + len_b)`; an empty side scores 0.
pub fn indel_ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    (200.0 * lcs_len(&a, &b) as f64 / (a.len() + b.len()) as f64).round()
}
