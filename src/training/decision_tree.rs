//! Decision tree implementation
//!
//! Binary Gini CART tree used as the base learner of the random forest.
//! Leaves hold the fraction of class-1 samples that reached them.

use crate::error::{Result, SelectError};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::index::sample;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with the class-1 fraction
    Leaf { value: f64, n_samples: usize },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        /// Sample-weighted Gini decrease of this split
        impurity_decrease: f64,
    },
}

/// Gini impurity of a binary node with `pos` positives out of `n`
fn gini(pos: usize, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let p = pos as f64 / n as f64;
    2.0 * p * (1.0 - p)
}

/// Decision tree classifier
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
    /// Features drawn at each split; all features when `None`
    pub max_features: Option<usize>,
    /// Number of features
    n_features: usize,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTree {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            n_features: 0,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
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

    /// Set number of features considered per split
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    /// Fit on the rows named by `indices` (repeats allowed, as in a bootstrap sample)
    pub fn fit_indices<R: Rng>(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        rng: &mut R,
    ) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(SelectError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }
        if indices.is_empty() {
            return Err(SelectError::ValidationError("no training samples".to_string()));
        }
        if self.min_samples_leaf == 0 || self.min_samples_split < 2 {
            return Err(SelectError::ValidationError(format!(
                "invalid tree limits: min_samples_split={}, min_samples_leaf={}",
                self.min_samples_split, self.min_samples_leaf
            )));
        }

        self.n_features = x.ncols();
        self.root = Some(self.build_tree(x, y, indices.to_vec(), 0, rng));
        Ok(())
    }

    /// Fit on every row of `x`
    pub fn fit<R: Rng>(&mut self, x: &Array2<f64>, y: &Array1<f64>, rng: &mut R) -> Result<()> {
        let indices: Vec<usize> = (0..x.nrows()).collect();
        self.fit_indices(x, y, &indices, rng)
    }

    fn build_tree<R: Rng>(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: Vec<usize>,
        depth: usize,
        rng: &mut R,
    ) -> TreeNode {
        let n_samples = indices.len();
        let pos = indices.iter().filter(|&&i| y[i] > 0.5).count();
        let leaf = TreeNode::Leaf {
            value: pos as f64 / n_samples as f64,
            n_samples,
        };

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || pos == 0
            || pos == n_samples;
        if should_stop {
            return leaf;
        }

        let Some((feature_idx, threshold, gain)) = self.find_best_split(x, y, &indices, pos, rng)
        else {
            return leaf;
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| x[[i, feature_idx]] <= threshold);

        let left = Box::new(self.build_tree(x, y, left_indices, depth + 1, rng));
        let right = Box::new(self.build_tree(x, y, right_indices, depth + 1, rng));

        TreeNode::Split {
            feature_idx,
            threshold,
            left,
            right,
            n_samples,
            impurity_decrease: gain * n_samples as f64,
        }
    }

    /// Best (feature, threshold, Gini decrease) among a random feature subset.
    /// Earlier candidates win exact ties.
    fn find_best_split<R: Rng>(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        total_pos: usize,
        rng: &mut R,
    ) -> Option<(usize, f64, f64)> {
        let n_features = x.ncols();
        let n_try = self.max_features.unwrap_or(n_features).clamp(1, n_features.max(1));
        let features: Vec<usize> = if n_try >= n_features {
            (0..n_features).collect()
        } else {
            sample(rng, n_features, n_try).into_vec()
        };

        let n = indices.len();
        let parent = gini(total_pos, n);
        let mut best: Option<(usize, f64, f64)> = None;

        for feature_idx in features {
            let mut sorted: Vec<(f64, bool)> = indices
                .iter()
                .map(|&i| (x[[i, feature_idx]], y[i] > 0.5))
                .collect();
            sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_pos = 0usize;
            for split in 1..n {
                if sorted[split - 1].1 {
                    left_pos += 1;
                }
                let (lo, hi) = (sorted[split - 1].0, sorted[split].0);
                if lo == hi {
                    continue;
                }
                let left_n = split;
                let right_n = n - split;
                if left_n < self.min_samples_leaf || right_n < self.min_samples_leaf {
                    continue;
                }

                let weighted = (left_n as f64 * gini(left_pos, left_n)
                    + right_n as f64 * gini(total_pos - left_pos, right_n))
                    / n as f64;
                let gain = parent - weighted;

                if gain > 1e-12 && best.map_or(true, |(_, _, g)| gain > g) {
                    best = Some((feature_idx, (lo + hi) / 2.0, gain));
                }
            }
        }

        best
    }

    fn leaf_value(&self, row: ArrayView1<f64>) -> Result<f64> {
        let mut node = self.root.as_ref().ok_or(SelectError::ModelNotFitted)?;
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
                    node = if row[*feature_idx] <= *threshold { left } else { right };
                }
            }
        }
    }

    /// Class-1 fraction of the leaf each row falls into
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.root.is_some() && x.ncols() != self.n_features {
            return Err(SelectError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        x.outer_iter()
            .map(|row| self.leaf_value(row))
            .collect::<Result<Vec<f64>>>()
            .map(Array1::from_vec)
    }

    /// Mean decrease in impurity per feature, normalized to sum to 1.
    /// All zeros when the tree is a single leaf.
    pub fn feature_importances(&self) -> Result<Array1<f64>> {
        fn walk(node: &TreeNode, acc: &mut Array1<f64>) {
            if let TreeNode::Split {
                feature_idx,
                left,
                right,
                impurity_decrease,
                ..
            } = node
            {
                acc[*feature_idx] += impurity_decrease;
                walk(left, acc);
                walk(right, acc);
            }
        }

        let root = self.root.as_ref().ok_or(SelectError::ModelNotFitted)?;
        let mut importances = Array1::zeros(self.n_features);
        walk(root, &mut importances);

        let total = importances.sum();
        if total > 0.0 {
            importances /= total;
        }
        Ok(importances)
    }

    /// Depth of the fitted tree (a lone leaf has depth 0)
    pub fn depth(&self) -> usize {
        fn walk(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + walk(left).max(walk(right)),
            }
        }
        self.root.as_ref().map_or(0, walk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_tree_separates_classes() {
        let x = array![[1.0, 0.0], [2.0, 0.0], [3.0, 1.0], [10.0, 1.0], [11.0, 0.0], [12.0, 1.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y, &mut ChaCha8Rng::seed_from_u64(0)).unwrap();

        let proba = tree.predict_proba(&x).unwrap();
        assert_eq!(proba, array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn test_max_depth_limits_growth() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        let y = array![0.0, 1.0, 0.0, 1.0, 0.0, 1.0];

        let mut tree = DecisionTree::new().with_max_depth(Some(1));
        tree.fit(&x, &y, &mut ChaCha8Rng::seed_from_u64(0)).unwrap();
        assert!(tree.depth() <= 1);
    }

    #[test]
    fn test_min_samples_leaf_respected() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![0.0, 1.0, 1.0, 1.0];

        let mut tree = DecisionTree::new().with_min_samples_leaf(2);
        tree.fit(&x, &y, &mut ChaCha8Rng::seed_from_u64(0)).unwrap();

        // A single-row leaf for the lone negative is not allowed
        let proba = tree.predict_proba(&array![[1.0]]).unwrap();
        assert!((proba[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_importances_follow_the_splitting_feature() {
        let x = array![[0.3, 1.0], [0.1, 2.0], [0.2, 3.0], [0.4, 10.0], [0.2, 11.0], [0.1, 12.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y, &mut ChaCha8Rng::seed_from_u64(0)).unwrap();

        assert_eq!(tree.feature_importances().unwrap(), array![0.0, 1.0]);
    }

    #[test]
    fn test_unfitted_tree() {
        let tree = DecisionTree::new();
        assert!(matches!(
            tree.predict_proba(&array![[1.0]]),
            Err(SelectError::ModelNotFitted)
        ));
    }
}
