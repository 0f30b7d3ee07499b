use ndarray::{Array1, ArrayView2, Axis};

/// Per-column statistics of a feature matrix: max, min, mean, population std.
#[derive(Debug, Clone)]
pub struct ColumnStatistics {
    pub mean: Array1<f64>,
    pub std: Array1<f64>,
    pub min: Array1<f64>,
    pub max: Array1<f64>,
    pub num_items: usize,
}

impl ColumnStatistics {
    /// Statistics over the rows of `xs`.
    ///
    /// Uses the running mean / sum-of-squares update so a single pass is
    /// enough. An empty matrix yields zero means and stds and infinite bounds.
    pub fn from_rows(xs: ArrayView2<'_, f64>) -> Self {
        let n_cols = xs.ncols();
        let mut mean = Array1::<f64>::zeros(n_cols);
        let mut sum_squares = Array1::<f64>::zeros(n_cols);
        let mut min = Array1::from_elem(n_cols, f64::INFINITY);
        let mut max = Array1::from_elem(n_cols, f64::NEG_INFINITY);
        let mut num_items = 0usize;

        for row in xs.axis_iter(Axis(0)) {
            num_items += 1;
            for (index, &item) in row.iter().enumerate() {
                if item < min[index] {
                    min[index] = item;
                }
                if item > max[index] {
                    max[index] = item;
                }
                let old_mean = mean[index];
                mean[index] += (item - old_mean) / num_items as f64;
                sum_squares[index] += (item - old_mean) * (item - mean[index]);
            }
        }

        let std = if num_items == 0 {
            Array1::zeros(n_cols)
        } else {
            sum_squares.mapv(|s| (s / num_items as f64).max(0.0).sqrt())
        };

        ColumnStatistics {
            mean,
            std,
            min,
            max,
            num_items,
        }
    }

    pub fn num_features(&self) -> usize {
        self.mean.len()
    }
}

/// Mean, population std, min and max of one slice of values.
pub fn summarize(values: &[f64]) -> [f64; 4] {
    if values.is_empty() {
        return [0.0; 4];
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    [mean, var.sqrt(), min, max]
}
