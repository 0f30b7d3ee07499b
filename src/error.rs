//! Error types for the experiment pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for experiment runs.
#[derive(Debug, Error)]
pub enum DoraError {
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Duplicate {kind} name: {name}")]
    DuplicateName { kind: &'static str, name: String },

    #[error("Unknown {kind}: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("Failed to load {}: {reason}", .path.display())]
    DataLoad { path: PathBuf, reason: String },

    #[error("Feature extraction error: {0}")]
    Feature(String),

    #[error("Algorithm {name} failed: {reason}")]
    Algorithm { name: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DoraError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn feature(msg: impl Into<String>) -> Self {
        Self::Feature(msg.into())
    }

    pub fn algorithm(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Algorithm {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn data_load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::DataLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }
}

/// Result type for experiment operations.
pub type Result<T> = std::result::Result<T, DoraError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let error = DoraError::not_found("algorithm", "nonexistent");
        assert_eq!(error.to_string(), "Unknown algorithm: nonexistent");
    }

    #[test]
    fn test_duplicate_name_display() {
        let error = DoraError::DuplicateName {
            kind: "data loader",
            name: "json".to_string(),
        };
        assert_eq!(error.to_string(), "Duplicate data loader name: json");
    }

    #[test]
    fn test_algorithm_display() {
        let error = DoraError::algorithm("pca", "k must not exceed 3");
        assert_eq!(error.to_string(), "Algorithm pca failed: k must not exceed 3");
    }

    #[test]
    fn test_data_load_display() {
        let error = DoraError::data_load("fit.csv", "line 3: bad number");
        assert_eq!(error.to_string(), "Failed to load fit.csv: line 3: bad number");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error: DoraError = io.into();
        assert!(matches!(error, DoraError::Io(_)));
    }
}
