use crate::config::{parse_params, Params};
use crate::error::{DoraError, Result};
use crate::models::base_model::{check_shapes, BaseModel, OutlierDetection};
use crate::utils::linalg::squared_distance;
use ndarray::{Array2, ArrayView1, ArrayView2};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct KnnParams {
    #[serde(default = "default_k")]
    k: usize,
}

fn default_k() -> usize {
    5
}

/// Mean Euclidean distance to the `k` nearest fit samples.
pub struct KnnModel {
    k: usize,
    reference: Array2<f64>,
}

impl KnnModel {
    pub fn new(k: usize) -> Self {
        KnnModel {
            k,
            reference: Array2::zeros((0, 0)),
        }
    }
}

impl BaseModel for KnnModel {
    fn fit(&mut self, xs: ArrayView2<'_, f64>) -> Result<()> {
        if self.k > xs.nrows() {
            return Err(DoraError::algorithm(
                KnnOutlierDetection::NAME,
                format!("k = {} exceeds the {} fit samples", self.k, xs.nrows()),
            ));
        }
        self.reference = xs.to_owned();
        Ok(())
    }

    fn score_partial(&self, x: ArrayView1<'_, f64>) -> f64 {
        let mut distances: Vec<f64> = self
            .reference
            .rows()
            .into_iter()
            .map(|row| squared_distance(row, x).sqrt())
            .collect();
        if distances.is_empty() || self.k == 0 {
            return 0.0;
        }
        let k = self.k.min(distances.len());
        distances.select_nth_unstable_by(k - 1, f64::total_cmp);
        distances[..k].iter().sum::<f64>() / k as f64
    }
}

pub struct KnnOutlierDetection;

impl KnnOutlierDetection {
    pub const NAME: &'static str = "knn";

    fn params(&self, params: &Params) -> Result<KnnParams> {
        let parsed: KnnParams = parse_params(Self::NAME, params)?;
        if parsed.k == 0 {
            return Err(DoraError::config("knn: k must be >= 1"));
        }
        Ok(parsed)
    }
}

impl OutlierDetection for KnnOutlierDetection {
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
        KnnModel::new(params.k).fit_score(fit, score)
    }
}
