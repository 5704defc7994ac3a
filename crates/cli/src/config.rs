//! Configuration file support for resolution pipelines

use anyhow::{Context, Result};
use recdedup_core::PipelineConfig;
use std::path::Path;

/// Load a pipeline configuration from a file (YAML or TOML)
pub fn load(path: &Path) -> Result<PipelineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");

    match extension {
        "yaml" | "yml" => serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
        "toml" => toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
        _ => Err(anyhow::anyhow!(
            "Unsupported config file format: {}. Use .yaml, .yml, or .toml",
            extension
        )),
    }
}

/// Save a pipeline configuration, picking the format from the extension
pub fn save(config: &PipelineConfig, path: &Path) -> Result<()> {
    let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");

    let content = match extension {
        "yaml" | "yml" => serde_yaml::to_string(config)?,
        "toml" => toml::to_string_pretty(config)?,
        _ => {
            return Err(anyhow::anyhow!(
                "Unsupported config file format: {}. Use .yaml, .yml, or .toml",
                extension
            ))
        }
    };

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;

    Ok(())
}

/// Starter configuration: soundex blocking on one column, Levenshtein
/// comparison and a plain threshold
pub fn example() -> PipelineConfig {
    use recdedup_core::{BlockingConfig, ClassificationConfig, ComparisonConfig, PreprocessConfig};
    use std::collections::BTreeMap;

    PipelineConfig {
        preprocessing: Some(PreprocessConfig {
            lowercase: true,
            remove_diacritics: true,
            remove_punctuation: true,
            ..Default::default()
        }),
        blocking: BlockingConfig {
            algorithm: "standardBlocking".to_string(),
            columns: vec!["last_name".to_string()],
            window_size: None,
            n_letters: None,
            max_window_size: None,
            threshold: None,
        },
        comparison: ComparisonConfig {
            selected_algorithms: BTreeMap::from([
                ("first_name".to_string(), "Jaro-Winkler".to_string()),
                ("last_name".to_string(), "Levenshtein".to_string()),
            ]),
            q_value: None,
        },
        classification: ClassificationConfig {
            classification_type: "threshold".to_string(),
            threshold_match: Some(0.8),
            ..Default::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_is_valid() {
        assert!(example().validate().is_ok());
    }

    #[test]
    fn test_save_and_load_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.yaml");

        let config = example();
        save(&config, &path).unwrap();
        let loaded = load(&path).unwrap();

        assert_eq!(config, loaded);
    }

    #[test]
    fn test_save_and_load_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.toml");

        let config = example();
        save(&config, &path).unwrap();
        let loaded = load(&path).unwrap();

        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_handwritten_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.yml");
        std::fs::write(
            &path,
            r#"
blocking:
  algorithm: sortedNeighborhood
  columns: [name]
  windowSize: 4
comparison:
  selectedAlgorithms:
    name: Q-gram
  qValue: 3
classification:
  classificationType: threshold
  thresholdMatch: 0.7
  thresholdNotMatch: 0.4
  possibleMatch: true
"#
        )
        .unwrap();

        let config = load(&path).unwrap();
        assert!(config.preprocessing.is_none());
        assert_eq!(config.blocking.window_size, Some(4));
        assert_eq!(config.comparison.q_value, Some(3));
        assert!(config.classification.possible_match);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unsupported_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");

        assert!(save(&example(), &path).is_err());
        std::fs::write(&path, "{}").unwrap();
        assert!(load(&path).is_err());
    }
}
