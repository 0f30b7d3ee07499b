use crate::config::{parse_params, Params};
use crate::error::{DoraError, Result};
use crate::models::base_model::{check_shapes, BaseModel, OutlierDetection};
use crate::utils::linalg::{covariance, pinv_symmetric};
use crate::utils::ColumnStatistics;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RxParams {
    /// Added to the covariance diagonal before inversion.
    #[serde(default)]
    regularization: f64,
}

/// Reed-Xiaoli model: Mahalanobis distance to the fit-set background.
pub struct RxModel {
    regularization: f64,
    mean: Array1<f64>,
    precision: Array2<f64>,
}

impl RxModel {
    pub fn new(regularization: f64) -> Self {
        RxModel {
            regularization,
            mean: Array1::zeros(0),
            precision: Array2::zeros((0, 0)),
        }
    }
}

impl BaseModel for RxModel {
    fn fit(&mut self, xs: ArrayView2<'_, f64>) -> Result<()> {
        let stats = ColumnStatistics::from_rows(xs);
        let mut cov = covariance(xs, stats.mean.view());
        cov.diag_mut().mapv_inplace(|v| v + self.regularization);
        self.precision = pinv_symmetric(&cov).ok_or_else(|| {
            DoraError::algorithm(RxOutlierDetection::NAME, "covariance pseudo-inverse failed")
        })?;
        self.mean = stats.mean;
        Ok(())
    }

    fn score_partial(&self, x: ArrayView1<'_, f64>) -> f64 {
        let centered = &x - &self.mean;
        centered.dot(&self.precision.dot(&centered))
    }
}

pub struct RxOutlierDetection;

impl RxOutlierDetection {
    pub const NAME: &'static str = "rx";

    fn params(&self, params: &Params) -> Result<RxParams> {
        let parsed: RxParams = parse_params(Self::NAME, params)?;
        if !(parsed.regularization >= 0.0) {
            return Err(DoraError::config("rx: regularization must be >= 0"));
        }
        Ok(parsed)
    }
}

impl OutlierDetection for RxOutlierDetection {
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
        RxModel::new(params.regularization).fit_score(fit, score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn background() -> Array2<f64> {
        array![
            [0.0, 0.1],
            [0.2, -0.1],
            [-0.1, 0.0],
            [0.1, 0.2],
            [-0.2, -0.2],
            [0.0, -0.1],
        ]
    }

    #[test]
    fn test_far_point_scores_highest() {
        let score = array![[0.0, 0.0], [5.0, 5.0], [0.1, 0.1]];
        let scores = RxOutlierDetection
            .score(background().view(), score.view(), 0, &Params::Null)
            .unwrap();

        assert!(scores[1] > scores[0]);
        assert!(scores[1] > scores[2]);
        assert!(scores.iter().all(|s| *s >= -1e-9));
    }

    #[test]
    fn test_singular_background_is_finite() {
        let fit = array![[1.0, 1.0], [1.0, 1.0], [1.0, 1.0]];
        let score = array![[1.0, 1.0], [2.0, 3.0]];
        let scores = RxOutlierDetection
            .score(fit.view(), score.view(), 0, &Params::Null)
            .unwrap();
        assert!(scores.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_negative_regularization_rejected() {
        let params: Params = serde_yaml::from_str("regularization: -1.0").unwrap();
        assert!(RxOutlierDetection.validate_params(&params).is_err());
    }

    #[test]
    fn test_width_mismatch_is_algorithm_error() {
        let fit = array![[1.0, 2.0]];
        let score = array![[1.0]];
        let err = RxOutlierDetection
            .score(fit.view(), score.view(), 0, &Params::Null)
            .unwrap_err();
        assert!(matches!(err, DoraError::Algorithm { .. }));
    }
}
