//! Experiment pipeline for novelty and outlier detection.
//!
//! A YAML configuration names a data loader, a fit set, a score set, a
//! feature recipe, and a list of detection algorithms. The
//! [`ExperimentDriver`] loads both sets, extracts and optionally normalizes
//! features, then runs each algorithm in order; every algorithm writes its
//! top-N ranking under its own directory of `out_dir`.

pub mod config;
pub mod data;
pub mod driver;
pub mod error;
pub mod features;
pub mod models;
pub mod registry;
pub mod results;
pub mod utils;

#[cfg(feature = "python")]
mod python;

pub use config::{AlgorithmPlan, DoraConfig, FailurePolicy, Params};
pub use data::{DataLoader, Dataset};
pub use driver::{start, ExperimentDriver, ExperimentSummary, DEFAULT_SEED};
pub use error::{DoraError, Result};
pub use features::{extract_feature, z_score_normalize, FeatureRecipe, FeatureSpec};
pub use models::{BaseModel, DetectionInput, OutlierDetection};
pub use registry::{AlgorithmRegistry, DataLoaderRegistry, Registry, RegistryBuilder};
pub use results::{rank_top_n, RankedSample, ResultWriter, ResultsConfig};
