//! Regression tree used by the random forest

use crate::error::{ForecastError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with prediction value
    Leaf { value: f64, n_samples: usize },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

/// CART regression tree with the squared-error criterion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Tree root
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features considered per split; all when `None`
    pub max_features: Option<usize>,
    /// Number of features
    n_features: usize,
    /// Unnormalised impurity decrease per feature
    impurity_decrease: Vec<f64>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

struct BestSplit {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

impl DecisionTree {
    /// Create a new regressor tree
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            n_features: 0,
            impurity_decrease: Vec::new(),
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    /// Fit the tree on the given sample indices of `x`.
    ///
    /// Indices may repeat, which is how bootstrap samples are passed in.
    pub fn fit_indices<R: Rng>(
        &mut self,
        x: &[Vec<f64>],
        y: &[f64],
        indices: &[usize],
        rng: &mut R,
    ) -> Result<()> {
        if x.len() != y.len() {
            return Err(ForecastError::ValidationError(format!(
                "x has {} rows but y has {} values",
                x.len(),
                y.len()
            )));
        }
        if indices.is_empty() || x.is_empty() {
            return Err(ForecastError::DataError(
                "Cannot fit a tree on zero samples".to_string(),
            ));
        }
        if x[0].is_empty() {
            return Err(ForecastError::ValidationError(
                "Feature rows must not be empty".to_string(),
            ));
        }

        self.n_features = x[0].len();
        self.impurity_decrease = vec![0.0; self.n_features];
        let mut work = indices.to_vec();
        let root = self.build(x, y, &mut work, 0, rng);
        self.root = Some(root);
        Ok(())
    }

    /// Predict a single row
    pub fn predict_row(&self, row: &[f64]) -> Result<f64> {
        let mut node = self.root.as_ref().ok_or(ForecastError::ModelNotFitted)?;
        if row.len() != self.n_features {
            return Err(ForecastError::ValidationError(format!(
                "Expected {} features, got {}",
                self.n_features,
                row.len()
            )));
        }

        loop {
            match node {
                TreeNode::Leaf { value, .. } => return Ok(*value),
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    node = if row[*feature_idx] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    /// Impurity decrease per feature accumulated while fitting
    pub fn impurity_decrease(&self) -> &[f64] {
        &self.impurity_decrease
    }

    /// Depth of the fitted tree; a single leaf has depth 0
    pub fn depth(&self) -> usize {
        fn walk(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + walk(left).max(walk(right)),
            }
        }
        self.root.as_ref().map_or(0, walk)
    }

    fn build<R: Rng>(
        &mut self,
        x: &[Vec<f64>],
        y: &[f64],
        indices: &mut [usize],
        depth: usize,
        rng: &mut R,
    ) -> TreeNode {
        let n_samples = indices.len();
        let mean = indices.iter().map(|&i| y[i]).sum::<f64>() / n_samples as f64;

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || indices.iter().all(|&i| y[i] == y[indices[0]]);

        if should_stop {
            return TreeNode::Leaf {
                value: mean,
                n_samples,
            };
        }

        let split = match self.find_best_split(x, y, indices, rng) {
            Some(split) => split,
            None => {
                return TreeNode::Leaf {
                    value: mean,
                    n_samples,
                }
            }
        };

        self.impurity_decrease[split.feature_idx] += split.gain;

        let mid = partition(indices, |i| x[i][split.feature_idx] <= split.threshold);
        let (left_idx, right_idx) = indices.split_at_mut(mid);
        let left = self.build(x, y, left_idx, depth + 1, rng);
        let right = self.build(x, y, right_idx, depth + 1, rng);

        TreeNode::Split {
            feature_idx: split.feature_idx,
            threshold: split.threshold,
            left: Box::new(left),
            right: Box::new(right),
            n_samples,
        }
    }

    fn find_best_split<R: Rng>(
        &self,
        x: &[Vec<f64>],
        y: &[f64],
        indices: &[usize],
        rng: &mut R,
    ) -> Option<BestSplit> {
        let n = indices.len();
        let n_try = self.max_features.unwrap_or(self.n_features).clamp(1, self.n_features);
        let features = rand::seq::index::sample(rng, self.n_features, n_try).into_vec();

        let total_sum: f64 = indices.iter().map(|&i| y[i]).sum();
        let total_sq: f64 = indices.iter().map(|&i| y[i] * y[i]).sum();
        let parent_sse = total_sq - total_sum * total_sum / n as f64;

        let mut best: Option<BestSplit> = None;
        let mut order: Vec<usize> = indices.to_vec();

        for feature_idx in features {
            order.sort_by(|&a, &b| x[a][feature_idx].total_cmp(&x[b][feature_idx]));

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for k in 0..n - 1 {
                let yi = y[order[k]];
                left_sum += yi;
                left_sq += yi * yi;

                let left_n = k + 1;
                let right_n = n - left_n;
                if left_n < self.min_samples_leaf || right_n < self.min_samples_leaf {
                    continue;
                }

                let here = x[order[k]][feature_idx];
                let next = x[order[k + 1]][feature_idx];
                if here == next {
                    continue;
                }

                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                let child_sse = (left_sq - left_sum * left_sum / left_n as f64)
                    + (right_sq - right_sum * right_sum / right_n as f64);
                let gain = parent_sse - child_sse;

                if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(BestSplit {
                        feature_idx,
                        threshold: (here + next) / 2.0,
                        gain,
                    });
                }
            }
        }

        best
    }
}

/// Reorder `items` so those matching `pred` come first; returns their count
fn partition<F: Fn(usize) -> bool>(items: &mut [usize], pred: F) -> usize {
    let mut next = 0;
    for k in 0..items.len() {
        if pred(items[k]) {
            items.swap(next, k);
            next += 1;
        }
    }
    next
}
