use crate::config::Params;
use crate::error::{DoraError, Result};
use crate::results::{rank_top_n, ResultWriter, ResultsConfig, RunMetadata};
use ndarray::{ArrayView1, ArrayView2};
use rayon::prelude::*;
use std::path::Path;

/// A batch model: calibrate on the fit set, then score rows.
pub trait BaseModel: Sync {
    /// Learn the notion of "normal" from the fit set.
    fn fit(&mut self, xs: ArrayView2<'_, f64>) -> Result<()>;

    /// Score one instance. Higher is more novel.
    fn score_partial(&self, x: ArrayView1<'_, f64>) -> f64;

    /// Default: score every row, in row order.
    fn score(&self, xs: ArrayView2<'_, f64>) -> Vec<f64> {
        (0..xs.nrows())
            .into_par_iter()
            .map(|i| self.score_partial(xs.row(i)))
            .collect()
    }

    /// Default: fit on one set, score another.
    fn fit_score(&mut self, fit: ArrayView2<'_, f64>, score: ArrayView2<'_, f64>) -> Result<Vec<f64>> {
        self.fit(fit)?;
        Ok(self.score(score))
    }
}

/// Everything an algorithm run reads. The matrices are shared by every
/// algorithm of an experiment and are never mutated.
#[derive(Debug, Clone, Copy)]
pub struct DetectionInput<'a> {
    pub fit_features: ArrayView2<'a, f64>,
    pub score_features: ArrayView2<'a, f64>,
    /// One id per row of `score_features`.
    pub score_ids: &'a [String],
    pub out_dir: &'a Path,
    pub results: &'a ResultsConfig,
    pub top_n: usize,
    pub seed: u64,
}

/// A named novelty-detection algorithm that can be looked up by config.
pub trait OutlierDetection: Send + Sync {
    fn name(&self) -> &'static str;

    /// Check `params` against the algorithm's parameter schema.
    fn validate_params(&self, params: &Params) -> Result<()>;

    /// Novelty score for every row of `score`, in row order. The same seed
    /// and inputs must give the same scores.
    fn score(
        &self,
        fit: ArrayView2<'_, f64>,
        score: ArrayView2<'_, f64>,
        seed: u64,
        params: &Params,
    ) -> Result<Vec<f64>>;

    /// Score, rank, and write the top `input.top_n` samples under
    /// `<out_dir>/<name>/`.
    fn run(&self, input: &DetectionInput<'_>, params: &Params) -> Result<()> {
        let name = self.name();
        if input.score_features.nrows() != input.score_ids.len() {
            return Err(DoraError::algorithm(
                name,
                format!(
                    "{} score rows but {} score ids",
                    input.score_features.nrows(),
                    input.score_ids.len()
                ),
            ));
        }

        let scores = self.score(input.fit_features, input.score_features, input.seed, params)?;
        let ranking = rank_top_n(name, input.score_ids, &scores, input.top_n)?;

        let metadata = RunMetadata {
            algorithm: name,
            params,
            seed: input.seed,
            top_n: input.top_n,
            n_fit: input.fit_features.nrows(),
            n_score: input.score_features.nrows(),
            n_features: input.fit_features.ncols(),
        };
        let writer = ResultWriter::new(input.out_dir, name);
        writer.write(&ranking, input.score_ids, &scores, &metadata, input.results)?;
        tracing::debug!(algorithm = name, selected = ranking.len(), dir = %writer.dir().display(), "results written");
        Ok(())
    }
}

/// Errors shared by models that need a non-empty fit set whose width matches
/// the score set.
pub(crate) fn check_shapes(
    name: &str,
    fit: ArrayView2<'_, f64>,
    score: ArrayView2<'_, f64>,
) -> Result<()> {
    if fit.nrows() == 0 {
        return Err(DoraError::algorithm(name, "fit set is empty"));
    }
    if fit.ncols() != score.ncols() {
        return Err(DoraError::algorithm(
            name,
            format!(
                "fit set has {} features but score set has {}",
                fit.ncols(),
                score.ncols()
            ),
        ));
    }
    Ok(())
}
