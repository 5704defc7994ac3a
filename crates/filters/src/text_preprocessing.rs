//! Text normalization applied to record fields before blocking
//!
//! Provides the three string transforms of the preprocessing stage:
//! punctuation removal, lowercasing and diacritics removal.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::{Error, Result};

/// Text normalization configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextNormalizer {
    /// Convert to lowercase
    pub lowercase: bool,
    /// Strip combining marks after NFKD decomposition
    pub remove_diacritics: bool,
    /// Remove ASCII punctuation
    pub remove_punctuation: bool,
}

// Lazy-initialized regex for punctuation removal
static PUNCTUATION_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_punctuation_regex() -> &'static Regex {
    PUNCTUATION_REGEX.get_or_init(|| {
        Regex::new(r"[[:punct:]]").expect("Failed to compile punctuation regex")
    })
}

impl TextNormalizer {
    /// Create a new text normalizer with custom settings
    pub fn new(lowercase: bool, remove_diacritics: bool, remove_punctuation: bool) -> Self {
        Self {
            lowercase,
            remove_diacritics,
            remove_punctuation,
        }
    }

    /// Normalizer with every transform enabled
    pub fn all() -> Self {
        Self::new(true, true, true)
    }

    /// True when no transform is enabled
    pub fn is_noop(&self) -> bool {
        !(self.lowercase || self.remove_diacritics || self.remove_punctuation)
    }

    /// Normalize text according to configuration
    ///
    /// Applies transformations in the following order:
    /// 1. Punctuation removal (if enabled)
    /// 2. Lowercase conversion (if enabled)
    /// 3. Diacritics removal (if enabled)
    pub fn normalize(&self, text: &str) -> String {
        let mut result = text.to_string();

        if self.remove_punctuation {
            result = remove_punctuation(&result);
        }

        if self.lowercase {
            result = result.to_lowercase();
        }

        if self.remove_diacritics {
            result = remove_diacritics(&result);
        }

        result
    }

    /// Normalize a JSON field value
    ///
    /// Strings are normalized, nulls pass through untouched, and any other
    /// value type is rejected.
    pub fn normalize_value(&self, value: &Value) -> Result<Value> {
        match value {
            Value::String(s) => Ok(Value::String(self.normalize(s))),
            Value::Null => Ok(Value::Null),
            other => Err(Error::NonTextValue(value_kind(other))),
        }
    }
}

/// Remove every ASCII punctuation character
pub fn remove_punctuation(text: &str) -> String {
    get_punctuation_regex().replace_all(text, "").into_owned()
}

/// Decompose with NFKD and drop combining marks
pub fn remove_diacritics(text: &str) -> String {
    text.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Human-readable name of a JSON value's type
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lowercase() {
        let normalizer = TextNormalizer::new(true, false, false);
        assert_eq!(normalizer.normalize("Hello WORLD"), "hello world");
    }

    #[test]
    fn test_punctuation_removal() {
        let normalizer = TextNormalizer::new(false, false, true);
        assert_eq!(normalizer.normalize("Hello, World!"), "Hello World");
        assert_eq!(normalizer.normalize("pu,n;ctuati-on"), "punctuation");
    }

    #[test]
    fn test_diacritics_removal() {
        let normalizer = TextNormalizer::new(false, true, false);
        assert_eq!(normalizer.normalize("café"), "cafe");
        assert_eq!(normalizer.normalize("diåćriticś"), "diacritics");
    }

    #[test]
    fn test_diacritics_removal_folds_compatibility_forms() {
        let normalizer = TextNormalizer::new(false, true, false);
        assert_eq!(normalizer.normalize("ﬁancé"), "fiance");
        assert_eq!(normalizer.normalize("m²"), "m2");
    }

    #[test]
    fn test_all_transforms() {
        let normalizer = TextNormalizer::all();
        assert_eq!(normalizer.normalize("pu,n;ctuati-on"), "punctuation");
        assert_eq!(normalizer.normalize("diåćriticś"), "diacritics");
        assert_eq!(normalizer.normalize("LOWERCASE"), "lowercase");
    }

    #[test]
    fn test_noop() {
        let normalizer = TextNormalizer::default();
        assert!(normalizer.is_noop());
        assert_eq!(normalizer.normalize("Ünchanged, TEXT!"), "Ünchanged, TEXT!");
    }

    #[test]
    fn test_whitespace_preserved() {
        let normalizer = TextNormalizer::all();
        assert_eq!(normalizer.normalize("  Hello,  World "), "  hello  world ");
    }

    #[test]
    fn test_non_ascii_punctuation_kept() {
        // Only ASCII punctuation is stripped
        let normalizer = TextNormalizer::new(false, false, true);
        assert_eq!(normalizer.normalize("«quoted»"), "«quoted»");
    }

    #[test]
    fn test_different_scripts() {
        let normalizer = TextNormalizer::all();
        assert_eq!(normalizer.normalize("Привет мир"), "привет мир");
        assert_eq!(normalizer.normalize("こんにちは世界"), "こんにちは世界");
    }

    #[test]
    fn test_empty_string() {
        assert_eq!(TextNormalizer::all().normalize(""), "");
    }

    #[test]
    fn test_normalization_idempotent() {
        let normalizer = TextNormalizer::all();
        let once = normalizer.normalize("Crème Brûlée, S.A.");
        let twice = normalizer.normalize(&once);
        assert_eq!(once, "creme brulee sa");
        assert_eq!(once, twice);
    }

    #[test]
    fn test_normalize_value() {
        let normalizer = TextNormalizer::all();
        assert_eq!(normalizer.normalize_value(&json!("Élan!")).unwrap(), json!("elan"));
        assert_eq!(normalizer.normalize_value(&Value::Null).unwrap(), Value::Null);

        let err = normalizer.normalize_value(&json!(42)).unwrap_err();
        assert!(err.to_string().contains("number"));
    }
}
