use crate::driver::{start, DEFAULT_SEED};
use crate::features::z_score_normalize as normalize;
use crate::models::default_algorithms;
use numpy::{IntoPyArray, PyArray2, PyReadonlyArray2};
use pyo3::exceptions::{PyFileNotFoundError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use std::path::PathBuf;

fn to_py_err(err: crate::DoraError) -> PyErr {
    match err {
        crate::DoraError::ConfigNotFound(_) => PyFileNotFoundError::new_err(err.to_string()),
        crate::DoraError::Config(_) | crate::DoraError::NotFound { .. } => {
            PyValueError::new_err(err.to_string())
        }
        _ => PyRuntimeError::new_err(err.to_string()),
    }
}

/// Run one experiment. Returns the names of the algorithms that completed.
#[pyfunction]
#[pyo3(signature = (config_file, out_dir=None, seed=DEFAULT_SEED))]
fn run_experiment(
    py: Python<'_>,
    config_file: PathBuf,
    out_dir: Option<PathBuf>,
    seed: u64,
) -> PyResult<Vec<String>> {
    let summary = py
        .allow_threads(|| start(&config_file, out_dir.as_deref(), seed))
        .map_err(to_py_err)?;
    if let Some(failure) = summary.failures.first() {
        return Err(PyRuntimeError::new_err(format!(
            "{} failed: {}",
            failure.algorithm, failure.error
        )));
    }
    Ok(summary.completed)
}

/// Names of the built-in algorithms.
#[pyfunction]
fn list_algorithms() -> PyResult<Vec<String>> {
    let registry = default_algorithms().map_err(to_py_err)?;
    Ok(registry.names().into_iter().map(String::from).collect())
}

/// Z-score both arrays with statistics of `fit` alone.
#[pyfunction]
fn z_score_normalize<'py>(
    py: Python<'py>,
    fit: PyReadonlyArray2<'py, f64>,
    score: PyReadonlyArray2<'py, f64>,
) -> PyResult<(&'py PyArray2<f64>, &'py PyArray2<f64>)> {
    let (fit, score) = normalize(fit.as_array(), score.as_array()).map_err(to_py_err)?;
    Ok((fit.into_pyarray(py), score.into_pyarray(py)))
}

/// A Python module implemented in Rust.
#[pymodule]
fn dora_exp(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(run_experiment, m)?)?;
    m.add_function(wrap_pyfunction!(list_algorithms, m)?)?;
    m.add_function(wrap_pyfunction!(z_score_normalize, m)?)?;
    Ok(())
}
