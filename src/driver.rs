//! Experiment driver: plan validation, data preparation, and the per-algorithm
//! loop.

use crate::config::{DoraConfig, FailurePolicy};
use crate::data::{default_loaders, DataLoader};
use crate::error::{DoraError, Result};
use crate::features::{extract_feature, z_score_normalize};
use crate::models::{default_algorithms, DetectionInput, OutlierDetection};
use crate::registry::{AlgorithmRegistry, DataLoaderRegistry};
use std::path::{Path, PathBuf};
use tracing::{error, info, info_span};

/// Seed used when none is given on the command line.
pub const DEFAULT_SEED: u64 = 1234;

/// One algorithm that failed under [`FailurePolicy::Continue`].
#[derive(Debug, Clone)]
pub struct AlgorithmFailure {
    pub algorithm: String,
    pub error: String,
}

/// Outcome of a run.
#[derive(Debug, Clone, Default)]
pub struct ExperimentSummary {
    pub out_dir: PathBuf,
    /// Algorithms whose results were written, in run order.
    pub completed: Vec<String>,
    pub failures: Vec<AlgorithmFailure>,
}

impl ExperimentSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs experiments against a fixed set of registered loaders and algorithms.
pub struct ExperimentDriver {
    algorithms: AlgorithmRegistry,
    loaders: DataLoaderRegistry,
}

impl ExperimentDriver {
    pub fn new(algorithms: AlgorithmRegistry, loaders: DataLoaderRegistry) -> Self {
        Self {
            algorithms,
            loaders,
        }
    }

    /// Driver with every built-in loader and algorithm.
    pub fn with_defaults() -> Result<Self> {
        Ok(Self::new(default_algorithms()?, default_loaders()?))
    }

    pub fn algorithms(&self) -> &AlgorithmRegistry {
        &self.algorithms
    }

    pub fn loaders(&self) -> &DataLoaderRegistry {
        &self.loaders
    }

    /// Resolve every name in the config and check every parameter block.
    /// Nothing is read or written.
    pub fn validate_plan(&self, config: &DoraConfig) -> Result<&dyn DataLoader> {
        let loader = self.loaders.resolve(&config.data_loader.name)?;
        loader.validate_params(&config.data_loader.params)?;
        for (name, params) in config.outlier_detection.iter() {
            self.algorithms.resolve(name)?.validate_params(params)?;
        }
        Ok(loader)
    }

    /// Run one experiment end to end.
    pub fn run(&self, config: &DoraConfig, seed: u64) -> Result<ExperimentSummary> {
        let loader = self.validate_plan(config)?;

        let out_dir = config.out_dir.clone();
        if !out_dir.exists() {
            std::fs::create_dir_all(&out_dir)?;
            info!("Created out_dir: {}", display_abs(&out_dir));
        }

        info!("Loading data_to_fit");
        let fit_data = loader.load(&config.data_to_fit, &config.data_loader.params)?;
        info!("Loading data_to_score");
        let score_data = loader.load(&config.data_to_score, &config.data_loader.params)?;
        if fit_data.is_empty() {
            return Err(DoraError::data_load(
                &config.data_to_fit,
                "data_to_fit contains no samples",
            ));
        }

        let fit_features = extract_feature(&fit_data, &config.features)?;
        let score_features = extract_feature(&score_data, &config.features)?;
        info!(
            "data_to_fit dimension (row x column): {} x {}",
            fit_features.nrows(),
            fit_features.ncols()
        );
        info!(
            "data_to_score dimension (row x column): {} x {}",
            score_features.nrows(),
            score_features.ncols()
        );
        if fit_features.ncols() != score_features.ncols() {
            return Err(DoraError::feature(format!(
                "data_to_fit yields {} features but data_to_score yields {}",
                fit_features.ncols(),
                score_features.ncols()
            )));
        }

        let (fit_features, score_features) = if config.zscore_normalization {
            z_score_normalize(fit_features.view(), score_features.view())?
        } else {
            (fit_features, score_features)
        };

        let input = DetectionInput {
            fit_features: fit_features.view(),
            score_features: score_features.view(),
            score_ids: score_data.ids(),
            out_dir: &out_dir,
            results: &config.results,
            top_n: config.top_n,
            seed,
        };

        let mut summary = ExperimentSummary {
            out_dir: out_dir.clone(),
            ..Default::default()
        };
        let total = config.outlier_detection.len();
        for (position, (name, params)) in config.outlier_detection.iter().enumerate() {
            info!("Outlier detection [{}/{}]: {}", position + 1, total, name);
            let _span = info_span!("algorithm", name).entered();

            let algorithm = self.algorithms.resolve(name)?;
            match algorithm.run(&input, params) {
                Ok(()) => summary.completed.push(name.to_string()),
                Err(e) => match config.on_error {
                    FailurePolicy::FailFast => return Err(e),
                    FailurePolicy::Continue => {
                        error!("{name} failed, continuing: {e}");
                        summary.failures.push(AlgorithmFailure {
                            algorithm: name.to_string(),
                            error: e.to_string(),
                        });
                    }
                },
            }
        }
        Ok(summary)
    }
}

/// Load `config_file`, apply the out_dir override, and run it with the
/// built-in components.
pub fn start(config_file: &Path, out_dir: Option<&Path>, seed: u64) -> Result<ExperimentSummary> {
    if !config_file.exists() {
        return Err(DoraError::ConfigNotFound(absolute(config_file)));
    }

    let mut config = DoraConfig::load(config_file)?;
    if let Some(out_dir) = out_dir {
        config.out_dir = out_dir.to_path_buf();
        info!(
            "Argument out_dir is specified in the command line interface, and it will \
             overwrite the out_dir in the config file."
        );
        info!("out_dir used is {}", display_abs(&config.out_dir));
    }

    ExperimentDriver::with_defaults()?.run(&config, seed)
}

/// `path` joined onto the working directory unless it is already absolute.
pub fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

fn display_abs(path: &Path) -> String {
    absolute(path).display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AlgorithmPlan, LoaderConfig, Params};
    use crate::data::Dataset;
    use crate::features::{FeatureRecipe, FeatureSpec};
    use crate::registry::RegistryBuilder;
    use crate::results::{ResultsConfig, SELECTIONS_FILE};
    use ndarray::{Array2, ArrayView2};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Serves a fixed dataset per path and counts loads.
    struct StubLoader {
        loads: Arc<AtomicUsize>,
    }

    impl DataLoader for StubLoader {
        fn name(&self) -> &'static str {
            "stub"
        }

        fn validate_params(&self, _params: &Params) -> Result<()> {
            Ok(())
        }

        fn load(&self, path: &Path, _params: &Params) -> Result<Dataset> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            let n = if path.ends_with("fit") { 6 } else { 4 };
            let ids = (0..n).map(|i| format!("{}-{i}", path.display())).collect();
            let values = Array2::from_shape_fn((n, 2), |(i, j)| (i * 2 + j) as f64);
            Dataset::new(ids).with_field("v", values)
        }
    }

    /// Fails every run.
    struct Broken;

    impl OutlierDetection for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn validate_params(&self, _params: &Params) -> Result<()> {
            Ok(())
        }

        fn score(
            &self,
            _fit: ArrayView2<'_, f64>,
            _score: ArrayView2<'_, f64>,
            _seed: u64,
            _params: &Params,
        ) -> Result<Vec<f64>> {
            Err(DoraError::algorithm("broken", "always fails"))
        }
    }

    fn driver(loads: Arc<AtomicUsize>) -> ExperimentDriver {
        let mut algorithms = RegistryBuilder::new("algorithm");
        crate::models::register_algorithms(&mut algorithms).unwrap();
        algorithms.register("broken", Box::new(Broken)).unwrap();

        let mut loaders: RegistryBuilder<dyn DataLoader> = RegistryBuilder::new("data loader");
        loaders.register("stub", Box::new(StubLoader { loads })).unwrap();
        ExperimentDriver::new(algorithms.build(), loaders.build())
    }

    fn config(out_dir: &Path, algorithms: &[&str], on_error: FailurePolicy) -> DoraConfig {
        let mut plan = AlgorithmPlan::new();
        for name in algorithms {
            plan.push(*name, Params::Null);
        }
        DoraConfig {
            data_loader: LoaderConfig {
                name: "stub".into(),
                params: Params::Null,
            },
            data_to_fit: "fit".into(),
            data_to_score: "score".into(),
            features: FeatureRecipe(vec![FeatureSpec::Raw { field: "v".into() }]),
            zscore_normalization: true,
            outlier_detection: plan,
            out_dir: out_dir.to_path_buf(),
            results: ResultsConfig::default(),
            top_n: 2,
            on_error,
        }
    }

    #[test]
    fn test_runs_algorithms_in_config_order() {
        let tmp = TempDir::new().unwrap();
        let loads = Arc::new(AtomicUsize::new(0));
        let config = config(tmp.path(), &["rx", "random"], FailurePolicy::FailFast);

        let summary = driver(loads.clone()).run(&config, 42).unwrap();

        assert_eq!(summary.completed, vec!["rx", "random"]);
        assert!(summary.is_success());
        assert_eq!(loads.load(Ordering::SeqCst), 2);
        let selections =
            std::fs::read_to_string(tmp.path().join("rx").join(SELECTIONS_FILE)).unwrap();
        assert_eq!(selections.lines().count(), 3);
    }

    #[test]
    fn test_unknown_algorithm_fails_before_loading() {
        let tmp = TempDir::new().unwrap();
        let out_dir = tmp.path().join("out");
        let loads = Arc::new(AtomicUsize::new(0));
        let config = config(&out_dir, &["rx", "nonexistent"], FailurePolicy::FailFast);

        let err = driver(loads.clone()).run(&config, 1).unwrap_err();

        assert!(matches!(err, DoraError::NotFound { kind: "algorithm", .. }));
        assert_eq!(loads.load(Ordering::SeqCst), 0);
        assert!(!out_dir.exists());
    }

    #[test]
    fn test_invalid_params_fail_before_loading() {
        let tmp = TempDir::new().unwrap();
        let loads = Arc::new(AtomicUsize::new(0));
        // pca requires k.
        let config = config(tmp.path(), &["pca"], FailurePolicy::FailFast);

        let err = driver(loads.clone()).run(&config, 1).unwrap_err();
        assert!(matches!(err, DoraError::Config(_)));
        assert_eq!(loads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_fail_fast_stops_the_loop() {
        let tmp = TempDir::new().unwrap();
        let config = config(tmp.path(), &["random", "broken", "rx"], FailurePolicy::FailFast);

        let err = driver(Arc::new(AtomicUsize::new(0))).run(&config, 1).unwrap_err();

        assert!(matches!(err, DoraError::Algorithm { .. }));
        assert!(tmp.path().join("random").join(SELECTIONS_FILE).exists());
        assert!(!tmp.path().join("rx").exists());
    }

    #[test]
    fn test_continue_records_failure_and_runs_the_rest() {
        let tmp = TempDir::new().unwrap();
        let config = config(tmp.path(), &["random", "broken", "rx"], FailurePolicy::Continue);

        let summary = driver(Arc::new(AtomicUsize::new(0))).run(&config, 1).unwrap();

        assert_eq!(summary.completed, vec!["random", "rx"]);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].algorithm, "broken");
        assert!(!summary.is_success());
        assert!(tmp.path().join("rx").join(SELECTIONS_FILE).exists());
    }

    #[test]
    fn test_unknown_loader() {
        let tmp = TempDir::new().unwrap();
        let mut config = config(tmp.path(), &["random"], FailurePolicy::FailFast);
        config.data_loader.name = "hdf5".into();

        let err = driver(Arc::new(AtomicUsize::new(0))).run(&config, 1).unwrap_err();
        assert!(matches!(err, DoraError::NotFound { kind: "data loader", .. }));
    }

    #[test]
    fn test_absolute_path() {
        let relative = absolute(Path::new("results/run1"));
        assert!(relative.is_absolute());
        assert!(relative.ends_with("results/run1"));
        assert_eq!(absolute(Path::new("/tmp/out")), PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_start_missing_config() {
        let err = start(Path::new("/nonexistent/config.yml"), None, DEFAULT_SEED).unwrap_err();
        assert!(matches!(err, DoraError::ConfigNotFound(_)));
    }
}
