use crate::config::{parse_params, Params};
use crate::error::{DoraError, Result};
use crate::models::base_model::{check_shapes, BaseModel, OutlierDetection};
use ndarray::{ArrayView1, ArrayView2};
use rand::prelude::*;
use rand::seq::index::sample;
use rayon::prelude::*;
use serde::Deserialize;

const EULER_GAMMA: f64 = 0.5772156649;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct IForestParams {
    #[serde(default = "default_n_estimators")]
    n_estimators: usize,
    #[serde(default = "default_max_samples")]
    max_samples: usize,
}

fn default_n_estimators() -> usize {
    100
}

fn default_max_samples() -> usize {
    256
}

// Custom tree node structure
struct Node {
    split_feature: Option<usize>,
    split_value: f64,
    size: usize,
    left: Option<Box<Node>>,
    right: Option<Box<Node>>,
}

impl Node {
    fn leaf(size: usize) -> Self {
        Node {
            split_feature: None,
            split_value: 0.0,
            size,
            left: None,
            right: None,
        }
    }

    fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

/// Isolation forest over the fit set.
pub struct IsolationForest {
    n_estimators: usize,
    max_samples: usize,
    sample_size: usize,
    trees: Vec<Node>,
    seed: u64,
}

impl IsolationForest {
    pub fn new(n_estimators: usize, max_samples: usize, seed: u64) -> Self {
        IsolationForest {
            n_estimators,
            max_samples,
            sample_size: 0,
            trees: Vec::new(),
            seed,
        }
    }

    fn build_tree(
        data: ArrayView2<'_, f64>,
        rows: &[usize],
        height: usize,
        height_limit: usize,
        rng: &mut StdRng,
    ) -> Node {
        let size = rows.len();

        // Stop criteria
        if size <= 1 || height >= height_limit {
            return Node::leaf(size);
        }

        let split_feature = rng.gen_range(0..data.ncols());

        let mut min_val = f64::INFINITY;
        let mut max_val = f64::NEG_INFINITY;
        for &row in rows {
            let val = data[[row, split_feature]];
            min_val = min_val.min(val);
            max_val = max_val.max(val);
        }

        // If min == max, this is a leaf
        if (max_val - min_val).abs() < 1e-10 {
            return Node::leaf(size);
        }

        let split_value = rng.gen::<f64>() * (max_val - min_val) + min_val;

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .partition(|&&row| data[[row, split_feature]] < split_value);

        // Only split if we actually divided the data
        if left_rows.is_empty() || right_rows.is_empty() {
            return Node::leaf(size);
        }

        Node {
            split_feature: Some(split_feature),
            split_value,
            size,
            left: Some(Box::new(Self::build_tree(
                data,
                &left_rows,
                height + 1,
                height_limit,
                rng,
            ))),
            right: Some(Box::new(Self::build_tree(
                data,
                &right_rows,
                height + 1,
                height_limit,
                rng,
            ))),
        }
    }

    fn path_length(node: &Node, x: ArrayView1<'_, f64>, current_height: usize) -> f64 {
        if node.is_leaf() {
            return current_height as f64 + Self::average_path_length(node.size);
        }

        if let Some(split_feature) = node.split_feature {
            let child = if x[split_feature] < node.split_value {
                &node.left
            } else {
                &node.right
            };
            if let Some(child) = child {
                return Self::path_length(child, x, current_height + 1);
            }
        }

        current_height as f64
    }

    /// Average path length of an unsuccessful search in a binary search tree
    /// of `n` nodes.
    fn average_path_length(n: usize) -> f64 {
        match n {
            0 | 1 => 0.0,
            2 => 1.0,
            _ => {
                let n = n as f64;
                2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
            }
        }
    }
}

impl BaseModel for IsolationForest {
    fn fit(&mut self, xs: ArrayView2<'_, f64>) -> Result<()> {
        self.sample_size = self.max_samples.min(xs.nrows());
        let height_limit = (self.sample_size.max(2) as f64).log2().ceil() as usize;

        // Tree seeds are drawn up front so the forest does not depend on
        // how rayon schedules tree construction.
        let mut rng = StdRng::seed_from_u64(self.seed);
        let tree_seeds: Vec<u64> = (0..self.n_estimators).map(|_| rng.gen()).collect();
        let n_rows = xs.nrows();
        let sample_size = self.sample_size;

        self.trees = tree_seeds
            .into_par_iter()
            .map(|tree_seed| {
                let mut rng = StdRng::seed_from_u64(tree_seed);
                let rows = sample(&mut rng, n_rows, sample_size).into_vec();
                Self::build_tree(xs, &rows, 0, height_limit, &mut rng)
            })
            .collect();
        Ok(())
    }

    fn score_partial(&self, x: ArrayView1<'_, f64>) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }

        let total_path_length: f64 = self
            .trees
            .iter()
            .map(|tree| Self::path_length(tree, x, 0))
            .sum();
        let avg_path_length = total_path_length / self.trees.len() as f64;

        let expected_path_length = Self::average_path_length(self.sample_size);
        if expected_path_length > 0.0 {
            2.0f64.powf(-avg_path_length / expected_path_length)
        } else {
            1.0
        }
    }
}

pub struct IForestOutlierDetection;

impl IForestOutlierDetection {
    pub const NAME: &'static str = "iforest";

    fn params(&self, params: &Params) -> Result<IForestParams> {
        let parsed: IForestParams = parse_params(Self::NAME, params)?;
        if parsed.n_estimators == 0 {
            return Err(DoraError::config("iforest: n_estimators must be >= 1"));
        }
        if parsed.max_samples < 2 {
            return Err(DoraError::config("iforest: max_samples must be >= 2"));
        }
        Ok(parsed)
    }
}

impl OutlierDetection for IForestOutlierDetection {
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
        IsolationForest::new(params.n_estimators, params.max_samples, seed).fit_score(fit, score)
    }
}
