use crate::config::{parse_params, Params};
use crate::error::{DoraError, Result};
use crate::models::base_model::{check_shapes, BaseModel, OutlierDetection};
use crate::utils::linalg::squared_distance;
use crate::utils::ColumnStatistics;
use ndarray::{Array2, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NegativeSamplingParams {
    /// Number of synthetic negatives; defaults to the fit sample count.
    #[serde(default)]
    n_negatives: Option<usize>,
    #[serde(default = "default_k")]
    k: usize,
    /// Fraction of each feature's fit range added on both sides of the
    /// sampling box.
    #[serde(default = "default_margin")]
    margin: f64,
}

fn default_k() -> usize {
    10
}

fn default_margin() -> f64 {
    0.1
}

/// Discriminates the fit set from uniform negatives drawn over its padded
/// bounding box. A sample's score is `d_fit / (d_fit + d_neg)`, where each
/// term is the mean distance to the `k` nearest samples of that class, so
/// samples closer to the negatives than to the fit set score above 0.5.
pub struct NegativeSampling {
    k: usize,
    n_negatives: Option<usize>,
    margin: f64,
    rng: StdRng,
    positives: Array2<f64>,
    negatives: Array2<f64>,
}

impl NegativeSampling {
    pub fn new(k: usize, n_negatives: Option<usize>, margin: f64, seed: u64) -> Self {
        NegativeSampling {
            k,
            n_negatives,
            margin,
            rng: StdRng::seed_from_u64(seed),
            positives: Array2::zeros((0, 0)),
            negatives: Array2::zeros((0, 0)),
        }
    }

    fn mean_knn_distance(&self, reference: &Array2<f64>, x: ArrayView1<'_, f64>) -> f64 {
        let mut distances: Vec<f64> = reference
            .rows()
            .into_iter()
            .map(|row| squared_distance(row, x).sqrt())
            .collect();
        let k = self.k.min(distances.len());
        if k == 0 {
            return 0.0;
        }
        distances.select_nth_unstable_by(k - 1, f64::total_cmp);
        distances[..k].iter().sum::<f64>() / k as f64
    }
}

impl BaseModel for NegativeSampling {
    fn fit(&mut self, xs: ArrayView2<'_, f64>) -> Result<()> {
        let n_negatives = self.n_negatives.unwrap_or(xs.nrows());
        if self.k > xs.nrows() || self.k > n_negatives {
            return Err(DoraError::algorithm(
                NegativeSamplingOutlierDetection::NAME,
                format!(
                    "k = {} exceeds the {} fit samples or {} negatives",
                    self.k,
                    xs.nrows(),
                    n_negatives
                ),
            ));
        }

        let stats = ColumnStatistics::from_rows(xs);
        let bounds: Vec<(f64, f64)> = stats
            .min
            .iter()
            .zip(stats.max.iter())
            .map(|(&lo, &hi)| {
                // A constant feature still gets a box of width 2 * margin.
                let range = if hi > lo { hi - lo } else { 1.0 };
                (lo - self.margin * range, hi + self.margin * range)
            })
            .collect();

        let mut negatives = Array2::zeros((n_negatives, xs.ncols()));
        for mut row in negatives.rows_mut() {
            for (value, &(lo, hi)) in row.iter_mut().zip(&bounds) {
                *value = if hi > lo { self.rng.gen_range(lo..hi) } else { lo };
            }
        }
        self.negatives = negatives;
        self.positives = xs.to_owned();
        Ok(())
    }

    fn score_partial(&self, x: ArrayView1<'_, f64>) -> f64 {
        let d_fit = self.mean_knn_distance(&self.positives, x);
        let d_neg = self.mean_knn_distance(&self.negatives, x);
        if d_fit + d_neg == 0.0 {
            return 0.5;
        }
        d_fit / (d_fit + d_neg)
    }
}

pub struct NegativeSamplingOutlierDetection;

impl NegativeSamplingOutlierDetection {
    pub const NAME: &'static str = "negative_sampling";

    fn params(&self, params: &Params) -> Result<NegativeSamplingParams> {
        let parsed: NegativeSamplingParams = parse_params(Self::NAME, params)?;
        if parsed.k == 0 {
            return Err(DoraError::config("negative_sampling: k must be >= 1"));
        }
        if parsed.n_negatives == Some(0) {
            return Err(DoraError::config("negative_sampling: n_negatives must be >= 1"));
        }
        if !(parsed.margin >= 0.0 && parsed.margin.is_finite()) {
            return Err(DoraError::config("negative_sampling: margin must be >= 0"));
        }
        Ok(parsed)
    }
}

impl OutlierDetection for NegativeSamplingOutlierDetection {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn validate_params(&self, params: &Params) -> Result<()> {
        self.params(params).map(|_| ())
    }

    fn score(
        &self,
        fit: ArrayView2<'_, f64>,
        score: ArrayView2<'_, f64>,
        seed: u64,
        params: &Params,
    ) -> Result<Vec<f64>> {
        let params = self.params(params)?;
        check_shapes(Self::NAME, fit, score)?;
        NegativeSampling::new(params.k, params.n_negatives, params.margin, seed)
            .fit_score(fit, score)
    }
}
