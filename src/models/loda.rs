use crate::config::{parse_params, Params};
use crate::error::{DoraError, Result};
use crate::models::base_model::{check_shapes, BaseModel, OutlierDetection};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

/// Floor on bin density, so empty bins give a finite -ln(p).
const MIN_DENSITY: f64 = 1e-12;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LodaParams {
    #[serde(default = "default_num_bins")]
    num_bins: usize,
    #[serde(default = "default_num_random_cuts")]
    num_random_cuts: usize,
}

fn default_num_bins() -> usize {
    10
}

fn default_num_random_cuts() -> usize {
    100
}

/// One projection's histogram over the fit-set projected range.
struct Histogram {
    min: f64,
    max: f64,
    width: f64,
    densities: Vec<f64>,
}

impl Histogram {
    /// Fit-set density of projected value `z`. Only values outside the
    /// fit-set range `[min, max]` get the floor.
    fn density(&self, z: f64) -> f64 {
        if z < self.min || z > self.max {
            return MIN_DENSITY;
        }
        if self.width == 0.0 {
            return self.densities[0];
        }
        let bins = self.densities.len();
        let bin = (((z - self.min) / self.width) as usize).min(bins - 1);
        self.densities[bin]
    }
}

/// Batch LODA: sparse random projections, each summarized by a histogram of
/// the fit set. The score is the mean negative log density.
pub struct Loda {
    num_bins: usize,
    num_random_cuts: usize,
    rng: StdRng,
    projections: Array2<f64>,
    histograms: Vec<Histogram>,
}

impl Loda {
    pub fn new(num_bins: usize, num_random_cuts: usize, seed: u64) -> Self {
        Loda {
            num_bins,
            num_random_cuts,
            rng: StdRng::seed_from_u64(seed),
            projections: Array2::zeros((0, 0)),
            histograms: Vec::new(),
        }
    }

    fn init_projections(&mut self, num_features: usize) {
        let n_nonzero_components = (num_features as f64).sqrt() as usize;
        let n_zero_components = num_features - n_nonzero_components.max(1).min(num_features);

        self.projections = Array2::zeros((self.num_random_cuts, num_features));
        for mut projection in self.projections.axis_iter_mut(Axis(0)) {
            for value in projection.iter_mut() {
                *value = self.rng.gen_range(-1.0..1.0);
            }

            // Zero out some components
            let mut indices: Vec<usize> = (0..num_features).collect();
            indices.shuffle(&mut self.rng);
            for &idx in indices.iter().take(n_zero_components) {
                projection[idx] = 0.0;
            }
        }
    }

    fn project(&self, x: ArrayView1<'_, f64>) -> Array1<f64> {
        self.projections.dot(&x)
    }
}

impl BaseModel for Loda {
    fn fit(&mut self, xs: ArrayView2<'_, f64>) -> Result<()> {
        self.init_projections(xs.ncols());
        // Rows go through the same projection as scored samples, so the
        // stored bounds compare exactly against scored values.
        let mut projected = Array2::zeros((xs.nrows(), self.num_random_cuts));
        for (row, mut target) in xs.axis_iter(Axis(0)).zip(projected.axis_iter_mut(Axis(0))) {
            target.assign(&self.project(row));
        }

        self.histograms = projected
            .axis_iter(Axis(1))
            .map(|column| {
                let min = column.iter().copied().fold(f64::INFINITY, f64::min);
                let max = column.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let width = (max - min) / self.num_bins as f64;

                let mut counts = vec![0.0; self.num_bins];
                for &z in column.iter() {
                    let bin = if width > 0.0 {
                        (((z - min) / width) as usize).min(self.num_bins - 1)
                    } else {
                        0
                    };
                    counts[bin] += 1.0;
                }
                let total = column.len() as f64;
                let densities = counts
                    .into_iter()
                    .map(|c| (c / total).max(MIN_DENSITY))
                    .collect();
                Histogram {
                    min,
                    max,
                    width,
                    densities,
                }
            })
            .collect();
        Ok(())
    }

    fn score_partial(&self, x: ArrayView1<'_, f64>) -> f64 {
        if self.histograms.is_empty() {
            return 0.0;
        }
        let projected = self.project(x);
        let score: f64 = projected
            .iter()
            .zip(&self.histograms)
            .map(|(&z, histogram)| -histogram.density(z).ln())
            .sum();
        score / self.num_random_cuts as f64
    }
}

pub struct LodaOutlierDetection;

impl LodaOutlierDetection {
    pub const NAME: &'static str = "loda";

    fn params(&self, params: &Params) -> Result<LodaParams> {
        let parsed: LodaParams = parse_params(Self::NAME, params)?;
        if parsed.num_bins == 0 || parsed.num_random_cuts == 0 {
            return Err(DoraError::config(
                "loda: num_bins and num_random_cuts must be >= 1",
            ));
        }
        Ok(parsed)
    }
}

impl OutlierDetection for LodaOutlierDetection {
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
        Loda::new(params.num_bins, params.num_random_cuts, seed).fit_score(fit, score)
    }
}
