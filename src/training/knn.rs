//! K-Nearest Neighbors classifier

use super::models::{Classifier, ClassifierKind};
use crate::error::{Result, SelectError};
use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// KNN configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KNNConfig {
    /// Number of neighbors
    pub n_neighbors: usize,
}

impl Default for KNNConfig {
    fn default() -> Self {
        Self { n_neighbors: 5 }
    }
}

/// Euclidean K-Nearest Neighbors classifier with uniform votes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNNClassifier {
    config: KNNConfig,
    x_train: Option<Array2<f64>>,
    y_train: Option<Array1<f64>>,
}

impl KNNClassifier {
    pub fn new(config: KNNConfig) -> Self {
        Self {
            config,
            x_train: None,
            y_train: None,
        }
    }

    /// Create with default config and specified k
    pub fn with_k(k: usize) -> Self {
        Self::new(KNNConfig { n_neighbors: k })
    }

    fn fitted(&self) -> Result<(&Array2<f64>, &Array1<f64>)> {
        match (&self.x_train, &self.y_train) {
            (Some(x), Some(y)) => Ok((x, y)),
            _ => Err(SelectError::ModelNotFitted),
        }
    }
}

impl Classifier for KNNClassifier {
    fn kind(&self) -> ClassifierKind {
        ClassifierKind::Distance
    }

    /// Stores the training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(SelectError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }
        if self.config.n_neighbors == 0 {
            return Err(SelectError::ValidationError(
                "n_neighbors must be at least 1".to_string(),
            ));
        }
        if x.nrows() < self.config.n_neighbors {
            return Err(SelectError::ValidationError(format!(
                "n_neighbors ({}) exceeds training samples ({})",
                self.config.n_neighbors,
                x.nrows()
            )));
        }

        self.x_train = Some(x.clone());
        self.y_train = Some(y.clone());
        Ok(())
    }

    /// Majority vote; an even split goes to class 0
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.mapv(|p| if p > 0.5 { 1.0 } else { 0.0 }))
    }

    fn supports_proba(&self) -> bool {
        true
    }

    /// Fraction of the k nearest neighbours labelled 1 (parallel over rows)
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (x_train, y_train) = self.fitted()?;
        if x.ncols() != x_train.ncols() {
            return Err(SelectError::ShapeError {
                expected: format!("{} features", x_train.ncols()),
                actual: format!("{} features", x.ncols()),
            });
        }
        let k = self.config.n_neighbors;

        let probs: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let neighbors = find_k_nearest(x.row(i), x_train, k);
                let positives = neighbors.iter().filter(|&&idx| y_train[idx] > 0.5).count();
                positives as f64 / neighbors.len() as f64
            })
            .collect();

        Ok(Array1::from_vec(probs))
    }
}

/// Max-heap entry ordered by (distance, training row index)
#[derive(PartialEq)]
struct Neighbor(f64, usize);

impl Eq for Neighbor {}
impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0).then(self.1.cmp(&other.1))
    }
}

/// Indices of the k nearest training rows, keeping a max-heap of size k.
/// Equal distances prefer the earlier training row.
fn find_k_nearest(point: ArrayView1<f64>, x_train: &Array2<f64>, k: usize) -> Vec<usize> {
    let mut heap = BinaryHeap::with_capacity(k + 1);

    for (i, row) in x_train.outer_iter().enumerate() {
        let dist: f64 = point
            .iter()
            .zip(row.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum();
        let candidate = Neighbor(dist, i);
        if heap.len() < k {
            heap.push(candidate);
        } else if let Some(top) = heap.peek() {
            if candidate < *top {
                heap.pop();
                heap.push(candidate);
            }
        }
    }

    heap.into_iter().map(|n| n.1).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_knn_classifier() {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.1],
            [0.2, 0.0],
            [5.0, 5.0],
            [5.1, 5.1],
            [5.2, 5.0],
        ];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut knn = KNNClassifier::with_k(3);
        knn.fit(&x, &y).unwrap();

        let preds = knn.predict(&array![[0.05, 0.05], [5.05, 5.05]]).unwrap();
        assert_eq!(preds, array![0.0, 1.0]);
    }

    #[test]
    fn test_vote_fractions() {
        let x = array![[0.0], [1.0], [2.0], [10.0], [11.0]];
        let y = array![0.0, 0.0, 1.0, 1.0, 1.0];

        let mut knn = KNNClassifier::with_k(3);
        knn.fit(&x, &y).unwrap();

        let proba = knn.predict_proba(&array![[0.5]]).unwrap();
        assert!((proba[0] - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_even_split_goes_to_class_zero() {
        let x = array![[-1.0], [1.0]];
        let y = array![1.0, 0.0];

        let mut knn = KNNClassifier::with_k(2);
        knn.fit(&x, &y).unwrap();
        assert_eq!(knn.predict(&array![[0.0]]).unwrap(), array![0.0]);
    }

    #[test]
    fn test_k_larger_than_training_set() {
        let mut knn = KNNClassifier::with_k(5);
        assert!(knn.fit(&array![[0.0], [1.0]], &array![0.0, 1.0]).is_err());
        assert!(matches!(
            KNNClassifier::with_k(1).predict(&array![[0.0]]),
            Err(SelectError::ModelNotFitted)
        ));
    }
}
