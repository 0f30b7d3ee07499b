use crate::config::{parse_params, Params};
use crate::error::Result;
use crate::models::base_model::OutlierDetection;
use ndarray::ArrayView2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RandomParams {}

/// Statistical control: uniform random scores, features ignored apart from
/// the number of score rows.
pub struct RandomOutlierDetection;

impl RandomOutlierDetection {
    pub const NAME: &'static str = "random";
}

impl OutlierDetection for RandomOutlierDetection {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn validate_params(&self, params: &Params) -> Result<()> {
        parse_params::<RandomParams>(Self::NAME, params).map(|_| ())
    }

    fn score(
        &self,
        _fit: ArrayView2<'_, f64>,
        score: ArrayView2<'_, f64>,
        seed: u64,
        params: &Params,
    ) -> Result<Vec<f64>> {
        self.validate_params(params)?;
        let mut rng = StdRng::seed_from_u64(seed);
        Ok((0..score.nrows()).map(|_| rng.gen::<f64>()).collect())
    }
}
