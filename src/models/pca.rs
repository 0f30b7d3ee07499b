use crate::config::{parse_params, Params};
use crate::error::{DoraError, Result};
use crate::models::base_model::{check_shapes, BaseModel, OutlierDetection};
use crate::utils::linalg::{covariance, symmetric_eigen};
use crate::utils::ColumnStatistics;
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PcaParams {
    /// Number of principal components kept.
    k: usize,
}

/// Reconstruction error after projecting onto the top `k` principal
/// components of the fit set.
pub struct PcaModel {
    k: usize,
    mean: Array1<f64>,
    components: Array2<f64>,
}

impl PcaModel {
    pub fn new(k: usize) -> Self {
        PcaModel {
            k,
            mean: Array1::zeros(0),
            components: Array2::zeros((0, 0)),
        }
    }
}

impl BaseModel for PcaModel {
    fn fit(&mut self, xs: ArrayView2<'_, f64>) -> Result<()> {
        if self.k > xs.ncols() {
            return Err(DoraError::algorithm(
                PcaOutlierDetection::NAME,
                format!("k = {} exceeds the {} available features", self.k, xs.ncols()),
            ));
        }
        let stats = ColumnStatistics::from_rows(xs);
        let cov = covariance(xs, stats.mean.view());
        let (_, vectors) = symmetric_eigen(&cov);
        self.components = vectors.slice(s![.., ..self.k]).to_owned();
        self.mean = stats.mean;
        Ok(())
    }

    fn score_partial(&self, x: ArrayView1<'_, f64>) -> f64 {
        let centered = &x - &self.mean;
        let projected = self.components.t().dot(&centered);
        let reconstructed = self.components.dot(&projected);
        (&centered - &reconstructed).mapv(|v| v * v).sum()
    }
}

pub struct PcaOutlierDetection;

impl PcaOutlierDetection {
    pub const NAME: &'static str = "pca";

    fn params(&self, params: &Params) -> Result<PcaParams> {
        let parsed: PcaParams = parse_params(Self::NAME, params)?;
        if parsed.k == 0 {
            return Err(DoraError::config("pca: k must be >= 1"));
        }
        Ok(parsed)
    }
}

impl OutlierDetection for PcaOutlierDetection {
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
        PcaModel::new(params.k).fit_score(fit, score)
    }
}
