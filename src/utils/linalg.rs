//! Dense linear-algebra helpers for the projection and covariance based
//! detectors. Decompositions run on nalgebra; inputs and outputs stay ndarray.

use nalgebra::DMatrix;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// Singular values below this fraction of the largest are treated as zero.
const PINV_RELATIVE_CUTOFF: f64 = 1e-10;

pub fn to_dmatrix(xs: ArrayView2<'_, f64>) -> DMatrix<f64> {
    DMatrix::from_fn(xs.nrows(), xs.ncols(), |i, j| xs[[i, j]])
}

pub fn from_dmatrix(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

/// Sample covariance of the rows of `xs` around `mean` (n - 1 denominator,
/// falling back to n for a single row).
pub fn covariance(xs: ArrayView2<'_, f64>, mean: ArrayView1<'_, f64>) -> Array2<f64> {
    let centered = &xs - &mean.insert_axis(Axis(0));
    let denom = xs.nrows().saturating_sub(1).max(1) as f64;
    centered.t().dot(&centered) / denom
}

/// Eigen-decomposition of a symmetric matrix.
///
/// Returns eigenvalues in descending order and the matching unit
/// eigenvectors as columns. Each eigenvector's sign is fixed so its
/// largest-magnitude component is positive.
pub fn symmetric_eigen(matrix: &Array2<f64>) -> (Array1<f64>, Array2<f64>) {
    let n = matrix.nrows();
    if n == 0 {
        return (Array1::zeros(0), Array2::zeros((0, 0)));
    }
    let eigen = to_dmatrix(matrix.view()).symmetric_eigen();

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| {
        eigen.eigenvalues[j]
            .total_cmp(&eigen.eigenvalues[i])
            .then(i.cmp(&j))
    });

    let values = Array1::from_iter(order.iter().map(|&i| eigen.eigenvalues[i]));
    let mut vectors = Array2::<f64>::zeros((n, n));
    for (dst, &src) in order.iter().enumerate() {
        let column = eigen.eigenvectors.column(src);
        let pivot = column
            .iter()
            .copied()
            .fold(0.0f64, |best, x| if x.abs() > best.abs() { x } else { best });
        let sign = if pivot < 0.0 { -1.0 } else { 1.0 };
        for (row, value) in column.iter().enumerate() {
            vectors[[row, dst]] = sign * value;
        }
    }
    (values, vectors)
}

/// Moore-Penrose pseudo-inverse. `None` when the decomposition fails.
pub fn pinv_symmetric(matrix: &Array2<f64>) -> Option<Array2<f64>> {
    if matrix.is_empty() {
        return Some(matrix.clone());
    }
    let m = to_dmatrix(matrix.view());
    let largest = m.singular_values().max();
    let inverse = m.pseudo_inverse(largest * PINV_RELATIVE_CUTOFF).ok()?;
    Some(from_dmatrix(&inverse))
}

pub fn squared_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}
