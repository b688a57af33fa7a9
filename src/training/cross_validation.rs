//! Stratified resampling: k-fold partitions and the single train/test split

use crate::error::{Result, SelectError};
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single train/test split
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Row indices grouped by class label, ascending label order
fn indices_by_class(y: &Array1<f64>) -> BTreeMap<i64, Vec<usize>> {
    let mut class_indices: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (idx, &val) in y.iter().enumerate() {
        class_indices.entry(val.round() as i64).or_default().push(idx);
    }
    class_indices
}

/// Stratified k-fold splitter.
///
/// Rows of each class are shuffled with a seeded generator, then dealt to
/// folds round-robin. The dealing position carries over from one class to the
/// next, so fold sizes differ by at most one row and each class is spread over
/// the folds within one row of its global proportion.
#[derive(Debug, Clone)]
pub struct StratifiedKFold {
    n_splits: usize,
    random_state: u64,
}

impl StratifiedKFold {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            random_state: 0,
        }
    }

    /// Set random state for reproducibility
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// Generate the k train/test splits for labels `y`
    pub fn split(&self, y: &Array1<f64>) -> Result<Vec<CVSplit>> {
        let n_samples = y.len();
        if self.n_splits < 2 {
            return Err(SelectError::ValidationError(
                "n_splits must be at least 2".to_string(),
            ));
        }
        if n_samples < self.n_splits {
            return Err(SelectError::ValidationError(format!(
                "n_samples ({}) must be >= n_splits ({})",
                n_samples, self.n_splits
            )));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        let mut class_indices = indices_by_class(y);
        for indices in class_indices.values_mut() {
            indices.shuffle(&mut rng);
        }

        let mut fold_of = vec![0usize; n_samples];
        let mut position = 0usize;
        for indices in class_indices.values() {
            for &idx in indices {
                fold_of[idx] = position % self.n_splits;
                position += 1;
            }
        }

        let splits = (0..self.n_splits)
            .map(|fold_idx| {
                let (test_indices, train_indices): (Vec<usize>, Vec<usize>) =
                    (0..n_samples).partition(|&i| fold_of[i] == fold_idx);
                CVSplit {
                    train_indices,
                    test_indices,
                    fold_idx,
                }
            })
            .collect();

        Ok(splits)
    }
}

/// Stratified single train/test split.
///
/// The test partition holds `ceil(test_size * n)` rows. Per-class test counts
/// are the floor of each class's exact share, with leftover rows handed out by
/// largest fractional remainder (lower label first on equal remainders).
/// Returned indices are sorted ascending.
pub fn stratified_train_test_split(
    y: &Array1<f64>,
    test_size: f64,
    seed: u64,
) -> Result<CVSplit> {
    let n_samples = y.len();
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(SelectError::ValidationError(format!(
            "test_size must be in (0, 1), got {}",
            test_size
        )));
    }

    let n_test = (test_size * n_samples as f64).ceil() as usize;
    if n_test == 0 || n_test >= n_samples {
        return Err(SelectError::ValidationError(format!(
            "test_size {} leaves an empty partition for {} rows",
            test_size, n_samples
        )));
    }

    let mut class_indices = indices_by_class(y);

    let mut allocation: Vec<(i64, usize, f64)> = class_indices
        .iter()
        .map(|(&class, indices)| {
            let exact = n_test as f64 * indices.len() as f64 / n_samples as f64;
            (class, exact.floor() as usize, exact - exact.floor())
        })
        .collect();

    let assigned: usize = allocation.iter().map(|(_, count, _)| count).sum();
    let mut order: Vec<usize> = (0..allocation.len()).collect();
    // Stable sort keeps lower labels first among equal remainders
    order.sort_by(|&a, &b| allocation[b].2.total_cmp(&allocation[a].2));
    for &slot in order.iter().take(n_test.saturating_sub(assigned)) {
        allocation[slot].1 += 1;
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut test_indices = Vec::with_capacity(n_test);
    let mut train_indices = Vec::with_capacity(n_samples - n_test);

    for (class, count, _) in allocation {
        if let Some(indices) = class_indices.get_mut(&class) {
            indices.shuffle(&mut rng);
            let take = count.min(indices.len());
            test_indices.extend_from_slice(&indices[..take]);
            train_indices.extend_from_slice(&indices[take..]);
        }
    }

    test_indices.sort_unstable();
    train_indices.sort_unstable();

    Ok(CVSplit {
        train_indices,
        test_indices,
        fold_idx: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(n_zero: usize, n_one: usize) -> Array1<f64> {
        let mut v = vec![0.0; n_zero];
        v.extend(vec![1.0; n_one]);
        Array1::from_vec(v)
    }

    fn count_ones(y: &Array1<f64>, idx: &[usize]) -> usize {
        idx.iter().filter(|&&i| y[i] > 0.5).count()
    }

    #[test]
    fn test_stratified_k_fold_balanced() {
        let y = labels(5, 5);
        let splits = StratifiedKFold::new(5).with_random_state(42).split(&y).unwrap();

        assert_eq!(splits.len(), 5);
        for split in &splits {
            assert_eq!(split.test_indices.len(), 2);
            assert_eq!(count_ones(&y, &split.test_indices), 1);
        }
    }

    #[test]
    fn test_stratified_k_fold_covers_rows_once() {
        let y = labels(138, 164);
        let splits = StratifiedKFold::new(5).with_random_state(7).split(&y).unwrap();

        let mut all_test: Vec<usize> = splits.iter().flat_map(|s| s.test_indices.clone()).collect();
        all_test.sort();
        assert_eq!(all_test, (0..302).collect::<Vec<_>>());

        let sizes: Vec<usize> = splits.iter().map(|s| s.test_indices.len()).collect();
        let max = *sizes.iter().max().unwrap();
        let min = *sizes.iter().min().unwrap();
        assert!(max - min <= 1);

        let global = 164.0 / 302.0;
        for split in &splits {
            assert_eq!(split.train_indices.len() + split.test_indices.len(), 302);
            let n = split.test_indices.len() as f64;
            let ones = count_ones(&y, &split.test_indices) as f64;
            assert!((ones - global * n).abs() <= 1.0 + 1e-9);
        }
    }

    #[test]
    fn test_stratified_k_fold_deterministic() {
        let y = labels(40, 60);
        let a = StratifiedKFold::new(5).with_random_state(3).split(&y).unwrap();
        let b = StratifiedKFold::new(5).with_random_state(3).split(&y).unwrap();
        assert_eq!(a, b);

        let c = StratifiedKFold::new(5).with_random_state(4).split(&y).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_invalid_fold_count() {
        let y = labels(3, 3);
        assert!(StratifiedKFold::new(1).split(&y).is_err());
        assert!(StratifiedKFold::new(10).split(&y).is_err());
    }

    #[test]
    fn test_train_test_split_sizes_and_disjointness() {
        let y = labels(138, 164);
        let split = stratified_train_test_split(&y, 0.2, 42).unwrap();

        assert_eq!(split.test_indices.len(), 61);
        assert_eq!(split.train_indices.len(), 241);

        let mut union: Vec<usize> = split
            .train_indices
            .iter()
            .chain(split.test_indices.iter())
            .copied()
            .collect();
        union.sort();
        assert_eq!(union, (0..302).collect::<Vec<_>>());

        let ones = count_ones(&y, &split.test_indices) as f64;
        assert!((ones - 61.0 * 164.0 / 302.0).abs() <= 1.0);
    }

    #[test]
    fn test_train_test_split_deterministic() {
        let y = labels(50, 50);
        let a = stratified_train_test_split(&y, 0.25, 1).unwrap();
        let b = stratified_train_test_split(&y, 0.25, 1).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_train_test_split_rejects_bad_fraction() {
        let y = labels(5, 5);
        assert!(stratified_train_test_split(&y, 0.0, 1).is_err());
        assert!(stratified_train_test_split(&y, 1.0, 1).is_err());
    }
}
