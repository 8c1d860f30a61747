//! Pipeline configuration.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Parameters for building the occurrence table and fitting the classifier.
///
/// Can be stored as a JSON object on disk; missing keys take their defaults:
/// ```json
/// {
///   "input": "https://example.org/us_disaster_declarations.csv",
///   "cache_path": "data/processed_data.csv",
///   "top_k": 5
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Raw declarations CSV, as a local path or an `http(s)://` URL.
    pub input: String,
    /// Occurrence table cache; read instead of `input` when it exists.
    pub cache_path: PathBuf,
    /// Number of most frequent incident types kept.
    pub top_k: usize,
    pub test_fraction: f64,
    pub seed: u64,
    /// Drop rows for territories and other non-state codes before building.
    pub filter_states: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: "us_disaster_declarations.csv".to_string(),
            cache_path: PathBuf::from("processed_data.csv"),
            top_k: 5,
            test_fraction: 0.25,
            seed: 42,
            filter_states: true,
        }
    }
}

impl PipelineConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("invalid pipeline config in {path}"))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.top_k, 5);
        assert_eq!(config.seed, 42);
        assert_eq!(config.test_fraction, 0.25);
        assert!(config.filter_states);
        assert_eq!(config.cache_path, PathBuf::from("processed_data.csv"));
    }

    #[test]
    fn test_load_partial_json() {
        let path = std::env::temp_dir().join("disaster_forecast_config.json");
        std::fs::write(&path, r#"{"top_k": 3, "cache_path": "/tmp/occ.csv"}"#).unwrap();

        let config = PipelineConfig::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.top_k, 3);
        assert_eq!(config.cache_path, PathBuf::from("/tmp/occ.csv"));
        assert_eq!(config.seed, 42);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_invalid_json_fails() {
        let path = std::env::temp_dir().join("disaster_forecast_config_bad.json");
        std::fs::write(&path, "top_k = 3").unwrap();

        assert!(PipelineConfig::load(path.to_str().unwrap()).is_err());
        std::fs::remove_file(&path).unwrap();
    }
}
