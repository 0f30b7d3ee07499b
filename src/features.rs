//! Feature extraction and z-score normalization.

use crate::data::Dataset;
use crate::error::{DoraError, Result};
use crate::utils::stats::{summarize, ColumnStatistics};
use ndarray::{concatenate, Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Standard deviations at or below this are treated as zero variance.
pub const ZERO_VARIANCE_STD: f64 = 1e-12;

/// Ordered list of feature blocks. The feature matrix is the column-wise
/// concatenation of the blocks in this order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureRecipe(pub Vec<FeatureSpec>);

/// One block of columns derived from a dataset field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum FeatureSpec {
    /// The field's values verbatim.
    Raw { field: String },
    /// Mean, std, min and max of each sample's values.
    Summary { field: String },
    /// Fraction of each sample's values per equal-width bin over `[min, max]`.
    Histogram {
        field: String,
        bins: usize,
        min: f64,
        max: f64,
    },
}

impl FeatureSpec {
    pub fn field(&self) -> &str {
        match self {
            FeatureSpec::Raw { field }
            | FeatureSpec::Summary { field }
            | FeatureSpec::Histogram { field, .. } => field,
        }
    }

    fn extract(&self, values: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        match self {
            FeatureSpec::Raw { .. } => Ok(values.to_owned()),
            FeatureSpec::Summary { .. } => {
                let mut out = Array2::zeros((values.nrows(), 4));
                for (row, mut target) in values.axis_iter(Axis(0)).zip(out.axis_iter_mut(Axis(0))) {
                    let row = row.to_vec();
                    target.assign(&Array1::from(summarize(&row).to_vec()));
                }
                Ok(out)
            }
            FeatureSpec::Histogram {
                field,
                bins,
                min,
                max,
            } => {
                if *bins == 0 || !(max > min) {
                    return Err(DoraError::feature(format!(
                        "histogram on '{field}' needs bins >= 1 and max > min"
                    )));
                }
                let width = (max - min) / *bins as f64;
                let mut out = Array2::zeros((values.nrows(), *bins));
                for (row, mut target) in values.axis_iter(Axis(0)).zip(out.axis_iter_mut(Axis(0))) {
                    if row.is_empty() {
                        continue;
                    }
                    for &value in row.iter() {
                        if value < *min || value > *max {
                            continue;
                        }
                        let bin = (((value - min) / width) as usize).min(bins - 1);
                        target[bin] += 1.0;
                    }
                    target /= row.len() as f64;
                }
                Ok(out)
            }
        }
    }
}

/// Build the feature matrix of `dataset`. Row `i` is sample `i`.
pub fn extract_feature(dataset: &Dataset, recipe: &FeatureRecipe) -> Result<Array2<f64>> {
    if recipe.0.is_empty() {
        return Err(DoraError::feature("feature recipe is empty"));
    }

    let mut blocks = Vec::with_capacity(recipe.0.len());
    for spec in &recipe.0 {
        let values = dataset.field(spec.field()).ok_or_else(|| {
            DoraError::feature(format!(
                "recipe references unknown field '{}'; available: {}",
                spec.field(),
                dataset.field_names().collect::<Vec<_>>().join(", ")
            ))
        })?;
        blocks.push(spec.extract(values)?);
    }

    let views: Vec<ArrayView2<'_, f64>> = blocks.iter().map(|b| b.view()).collect();
    concatenate(Axis(1), &views).map_err(|e| DoraError::feature(e.to_string()))
}

/// Per-feature shift and scale learned from the fit set.
#[derive(Debug, Clone)]
pub struct ZScore {
    pub mean: Array1<f64>,
    pub scale: Array1<f64>,
}

impl ZScore {
    /// Statistics of `fit` only. Zero-variance features get scale 1, so they
    /// are centered but not scaled.
    pub fn fit(fit: ArrayView2<'_, f64>) -> Self {
        let stats = ColumnStatistics::from_rows(fit);
        let scale = stats
            .std
            .mapv(|s| if s <= ZERO_VARIANCE_STD { 1.0 } else { s });
        ZScore {
            mean: stats.mean,
            scale,
        }
    }

    pub fn transform(&self, xs: ArrayView2<'_, f64>) -> Array2<f64> {
        (&xs - &self.mean.view().insert_axis(Axis(0))) / &self.scale.view().insert_axis(Axis(0))
    }
}

/// Standardize both matrices with statistics of `fit` alone.
pub fn z_score_normalize(
    fit: ArrayView2<'_, f64>,
    score: ArrayView2<'_, f64>,
) -> Result<(Array2<f64>, Array2<f64>)> {
    if fit.ncols() != score.ncols() {
        return Err(DoraError::feature(format!(
            "fit matrix has {} features but score matrix has {}",
            fit.ncols(),
            score.ncols()
        )));
    }
    let zscore = ZScore::fit(fit);
    Ok((zscore.transform(fit), zscore.transform(score)))
}
