use crate::config::{parse_params, Params};
use crate::error::{DoraError, Result};
use crate::models::base_model::{check_shapes, OutlierDetection};
use crate::utils::linalg::symmetric_eigen;
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DemudParams {
    /// Number of principal components in the model of seen data.
    k: usize,
}

/// Low-rank model of everything seen so far: the fit set plus every
/// score sample already selected.
struct SeenModel {
    k: usize,
    count: f64,
    sum: Array1<f64>,
    /// Sum of outer products `x xᵀ` over seen samples.
    scatter: Array2<f64>,
    mean: Array1<f64>,
    basis: Array2<f64>,
}

impl SeenModel {
    fn new(k: usize, fit: ArrayView2<'_, f64>) -> Self {
        let d = fit.ncols();
        let mut model = SeenModel {
            k,
            count: 0.0,
            sum: Array1::zeros(d),
            scatter: Array2::zeros((d, d)),
            mean: Array1::zeros(d),
            basis: Array2::zeros((d, 0)),
        };
        for row in fit.rows() {
            model.absorb(row);
        }
        model.refresh();
        model
    }

    fn absorb(&mut self, x: ArrayView1<'_, f64>) {
        self.count += 1.0;
        self.sum += &x;
        let column = x.insert_axis(ndarray::Axis(1));
        self.scatter += &column.dot(&column.t());
    }

    /// Recompute the mean and top-`k` principal directions.
    fn refresh(&mut self) {
        self.mean = &self.sum / self.count;
        let outer = {
            let m = self.mean.view().insert_axis(ndarray::Axis(1));
            m.dot(&m.t())
        };
        let denom = (self.count - 1.0).max(1.0);
        let covariance = (&self.scatter - &(outer * self.count)) / denom;
        let (_, vectors) = symmetric_eigen(&covariance);
        self.basis = vectors.slice(s![.., ..self.k]).to_owned();
    }

    fn reconstruction_error(&self, x: ArrayView1<'_, f64>) -> f64 {
        let centered = &x - &self.mean;
        let projected = self.basis.t().dot(&centered);
        let residual = &centered - &self.basis.dot(&projected);
        residual.mapv(|v| v * v).sum()
    }
}

/// DEMUD: discovery via eigenbasis modeling of uninteresting data.
///
/// Samples are selected one at a time by largest reconstruction error under
/// the current model; each selection is folded into the model before the
/// next, so near-duplicates of a selected sample stop looking novel. The
/// score encodes selection order: the first selected sample scores
/// `n_score`, the last scores 1.
pub struct DemudOutlierDetection;

impl DemudOutlierDetection {
    pub const NAME: &'static str = "demud";

    fn params(&self, params: &Params) -> Result<DemudParams> {
        let parsed: DemudParams = parse_params(Self::NAME, params)?;
        if parsed.k == 0 {
            return Err(DoraError::config("demud: k must be >= 1"));
        }
        Ok(parsed)
    }
}

impl OutlierDetection for DemudOutlierDetection {
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
        _seed: u64,
        params: &Params,
    ) -> Result<Vec<f64>> {
        let params = self.params(params)?;
        check_shapes(Self::NAME, fit, score)?;
        if params.k > fit.ncols() {
            return Err(DoraError::algorithm(
                Self::NAME,
                format!("k = {} exceeds the {} available features", params.k, fit.ncols()),
            ));
        }

        let n = score.nrows();
        let mut model = SeenModel::new(params.k, fit);
        let mut scores = vec![0.0; n];
        let mut remaining: Vec<usize> = (0..n).collect();

        for position in 0..n {
            let mut best = 0;
            let mut best_error = f64::NEG_INFINITY;
            for (slot, &index) in remaining.iter().enumerate() {
                let error = model.reconstruction_error(score.row(index));
                if error > best_error {
                    best = slot;
                    best_error = error;
                }
            }
            let selected = remaining.remove(best);
            scores[selected] = (n - position) as f64;
            tracing::trace!(selected, error = best_error, "demud selection");

            if !remaining.is_empty() {
                model.absorb(score.row(selected));
                model.refresh();
            }
        }
        Ok(scores)
    }
}
