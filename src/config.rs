//! Experiment configuration.
//!
//! A YAML file with the shape:
//!
//! ```yaml
//! data_loader:
//!   name: featurevector
//!   params: { id_column: name }
//! data_to_fit: fit.csv
//! data_to_score: score.csv
//! features:
//!   - { type: raw, field: data }
//! zscore_normalization: true
//! outlier_detection:
//!   rx: {}
//!   pca: { k: 2 }
//! out_dir: results
//! results: { save_scores: true }
//! top_n: 10
//! ```

use crate::error::{DoraError, Result};
use crate::features::FeatureRecipe;
use crate::results::ResultsConfig;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

/// Free-form parameters as written in the config file. Each component parses
/// them into its own typed record.
pub type Params = serde_yaml::Value;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DoraConfig {
    pub data_loader: LoaderConfig,
    pub data_to_fit: PathBuf,
    pub data_to_score: PathBuf,
    pub features: FeatureRecipe,
    #[serde(default)]
    pub zscore_normalization: bool,
    pub outlier_detection: AlgorithmPlan,
    pub out_dir: PathBuf,
    #[serde(default)]
    pub results: ResultsConfig,
    pub top_n: usize,
    #[serde(default)]
    pub on_error: FailurePolicy,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoaderConfig {
    pub name: String,
    #[serde(default)]
    pub params: Params,
}

/// What the driver does when one algorithm fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Abort the run on the first failing algorithm.
    #[default]
    FailFast,
    /// Record the failure and keep running the remaining algorithms.
    Continue,
}

/// Algorithms to run, in file order, each with its raw parameters.
#[derive(Debug, Clone, Default)]
pub struct AlgorithmPlan(Vec<(String, Params)>);

impl AlgorithmPlan {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, name: impl Into<String>, params: Params) {
        self.0.push((name.into(), params));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Params)> {
        self.0.iter().map(|(name, params)| (name.as_str(), params))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for AlgorithmPlan {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let mapping = serde_yaml::Mapping::deserialize(deserializer)?;
        let mut plan = AlgorithmPlan::new();
        for (key, params) in mapping {
            let name = match key {
                serde_yaml::Value::String(name) => name,
                other => {
                    return Err(serde::de::Error::custom(format!(
                        "outlier_detection keys must be algorithm names, got {other:?}"
                    )))
                }
            };
            plan.push(name, params);
        }
        Ok(plan)
    }
}

impl DoraConfig {
    /// Read and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DoraError::ConfigNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: DoraConfig = serde_yaml::from_str(content)
            .map_err(|e| DoraError::config(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.data_loader.name.trim().is_empty() {
            return Err(DoraError::config("data_loader.name must not be empty"));
        }
        if self.outlier_detection.is_empty() {
            return Err(DoraError::config(
                "outlier_detection must list at least one algorithm",
            ));
        }
        if self.top_n == 0 {
            return Err(DoraError::config("top_n must be a positive integer"));
        }
        Ok(())
    }
}

/// Parse raw parameters into a typed record owned by `owner`.
///
/// A missing or null parameter block is read as an empty mapping, so records
/// with required keys still report them as missing.
pub fn parse_params<P: DeserializeOwned>(owner: &str, params: &Params) -> Result<P> {
    let value = match params {
        serde_yaml::Value::Null => serde_yaml::Value::Mapping(serde_yaml::Mapping::new()),
        other => other.clone(),
    };
    serde_yaml::from_value(value)
        .map_err(|e| DoraError::config(format!("invalid parameters for {owner}: {e}")))
}
