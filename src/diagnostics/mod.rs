//! Leakage audit of a raw dataset
//!
//! Runs on the file as read, before deduplication. The only model fitted is a
//! random forest on the train partition, used to rank features by impurity
//! importance. The overlap count uses the same stratified split the training
//! run would use, so rows that repeat across train and test are visible up front.

use crate::error::Result;
use crate::pipeline::RunConfig;
use crate::training::{stratified_train_test_split, Classifier, RandomForest, RandomForestConfig};
use crate::utils::{class_counts, DataLoader, NumericTable};
use ndarray::{ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::info;

/// Column whose values never repeat across outcome classes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeparatorColumn {
    pub column: String,
    /// Distinct values per outcome label
    pub unique_per_class: BTreeMap<i64, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsReport {
    pub source_path: String,
    pub n_rows: usize,
    pub feature_names: Vec<String>,
    pub class_counts: BTreeMap<i64, usize>,
    /// Rows repeating an earlier row exactly
    pub duplicate_rows: usize,
    pub identical_to_target: Vec<String>,
    pub suspected_separators: Vec<SeparatorColumn>,
    pub constant_columns: Vec<String>,
    /// Matching (train row, test row) pairs under the holdout split
    pub train_test_overlap: usize,
    /// Forest impurity importance per column, highest first.
    /// Empty when the train partition holds a single class.
    pub feature_importances: Vec<(String, f64)>,
}

impl DiagnosticsReport {
    /// True when no check found anything
    pub fn is_clean(&self) -> bool {
        self.duplicate_rows == 0
            && self.identical_to_target.is_empty()
            && self.suspected_separators.is_empty()
            && self.constant_columns.is_empty()
            && self.train_test_overlap == 0
    }
}

fn value_key(v: f64) -> u64 {
    if v == 0.0 {
        0
    } else {
        v.to_bits()
    }
}

fn row_key(features: ArrayView1<f64>, target: f64) -> Vec<u64> {
    features
        .iter()
        .chain(std::iter::once(&target))
        .map(|v| value_key(*v))
        .collect()
}

/// Audit the configured data file
pub fn diagnose(config: &RunConfig) -> Result<DiagnosticsReport> {
    let loader = DataLoader::new(config.target_column.as_str());
    let frame = loader.read_frame(&config.data_path)?;
    let table = loader.numeric_table(&frame)?;

    let report = diagnose_table(
        config.data_path.display().to_string(),
        &table,
        config.test_size,
        config.seeds().holdout,
        config.random_seed,
    )?;
    info!(
        rows = report.n_rows,
        duplicates = report.duplicate_rows,
        overlap = report.train_test_overlap,
        "Diagnostics complete"
    );
    Ok(report)
}

/// Audit an in-memory table
pub fn diagnose_table(
    source_path: String,
    table: &NumericTable,
    test_size: f64,
    holdout_seed: u64,
    forest_seed: u64,
) -> Result<DiagnosticsReport> {
    let y = &table.target;
    let mut identical_to_target = Vec::new();
    let mut suspected_separators = Vec::new();
    let mut constant_columns = Vec::new();

    for (j, name) in table.feature_names.iter().enumerate() {
        let column = table.features.column(j);

        if column.iter().zip(y.iter()).all(|(a, b)| a == b) {
            identical_to_target.push(name.clone());
        }

        let mut per_class: BTreeMap<i64, HashSet<u64>> = BTreeMap::new();
        let mut overall = HashSet::new();
        for (v, label) in column.iter().zip(y.iter()) {
            per_class
                .entry(label.round() as i64)
                .or_default()
                .insert(value_key(*v));
            overall.insert(value_key(*v));
        }
        let unique_per_class: BTreeMap<i64, usize> =
            per_class.into_iter().map(|(k, s)| (k, s.len())).collect();
        let sum: usize = unique_per_class.values().sum();
        let max = unique_per_class.values().copied().max().unwrap_or(0);
        if sum == max {
            suspected_separators.push(SeparatorColumn {
                column: name.clone(),
                unique_per_class,
            });
        }

        if overall.len() <= 1 {
            constant_columns.push(name.clone());
        }
    }

    let split = stratified_train_test_split(y, test_size, holdout_seed)?;
    let mut train_keys: HashMap<Vec<u64>, usize> = HashMap::new();
    for &i in &split.train_indices {
        *train_keys
            .entry(row_key(table.features.row(i), y[i]))
            .or_insert(0) += 1;
    }
    let train_test_overlap = split
        .test_indices
        .iter()
        .map(|&i| {
            train_keys
                .get(&row_key(table.features.row(i), y[i]))
                .copied()
                .unwrap_or(0)
        })
        .sum();

    let feature_importances = rank_importances(table, &split.train_indices, forest_seed)?;

    Ok(DiagnosticsReport {
        source_path,
        n_rows: table.n_rows(),
        feature_names: table.feature_names.clone(),
        class_counts: class_counts(y),
        duplicate_rows: table.duplicate_rows().len(),
        identical_to_target,
        suspected_separators,
        constant_columns,
        train_test_overlap,
        feature_importances,
    })
}

fn rank_importances(
    table: &NumericTable,
    train_indices: &[usize],
    seed: u64,
) -> Result<Vec<(String, f64)>> {
    let y_train = table.target.select(Axis(0), train_indices);
    if class_counts(&y_train).len() < 2 {
        return Ok(Vec::new());
    }
    let x_train = table.features.select(Axis(0), train_indices);

    let mut forest = RandomForest::new(RandomForestConfig {
        random_state: seed,
        ..Default::default()
    });
    forest.fit(&x_train, &y_train)?;
    let importances = forest.feature_importances()?;

    let mut ranked: Vec<(String, f64)> = table
        .feature_names
        .iter()
        .cloned()
        .zip(importances.iter().copied())
        .collect();
    // Stable, so equal importances keep column order
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};

    fn table(rows: &[[f64; 3]], target: &[f64]) -> NumericTable {
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        NumericTable {
            feature_names: vec!["copy".into(), "flat".into(), "noise".into()],
            features: Array2::from_shape_vec((rows.len(), 3), flat).unwrap(),
            target: Array1::from_vec(target.to_vec()),
        }
    }

    #[test]
    fn test_flags_copied_and_constant_columns() {
        let target = [0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0];
        let rows: Vec<[f64; 3]> = target
            .iter()
            .enumerate()
            .map(|(i, &t)| [t, 7.0, i as f64])
            .collect();

        let report = diagnose_table("mem".into(), &table(&rows, &target), 0.2, 1, 42).unwrap();
        assert_eq!(report.identical_to_target, vec!["copy".to_string()]);
        assert_eq!(report.constant_columns, vec!["flat".to_string()]);
        assert_eq!(report.duplicate_rows, 0);
        assert_eq!(report.train_test_overlap, 0);
        assert_eq!(report.class_counts.get(&1), Some(&5));
        assert!(!report.is_clean());
    }

    #[test]
    fn test_column_copying_target_has_top_importance() {
        let target: Vec<f64> = (0..40).map(|i| ((i * 7) % 3 == 0) as u8 as f64).collect();
        let rows: Vec<[f64; 3]> = target
            .iter()
            .enumerate()
            .map(|(i, &t)| [t, 7.0, ((i * 13) % 17) as f64])
            .collect();

        let report = diagnose_table("mem".into(), &table(&rows, &target), 0.2, 1, 42).unwrap();
        let names: Vec<&str> = report
            .feature_importances
            .iter()
            .map(|(name, _)| name.as_str())
            .collect();
        assert_eq!(names, vec!["copy", "noise", "flat"]);
        assert_eq!(report.feature_importances[2].1, 0.0);
        let total: f64 = report.feature_importances.iter().map(|(_, v)| v).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_class_train_split_skips_importances() {
        let target = [1.0, 1.0, 1.0, 1.0];
        let rows = [[1.0, 2.0, 3.0], [1.0, 4.0, 5.0], [1.0, 6.0, 7.0], [1.0, 8.0, 9.0]];

        let report = diagnose_table("mem".into(), &table(&rows, &target), 0.5, 1, 42).unwrap();
        assert!(report.feature_importances.is_empty());
    }

    #[test]
    fn test_single_class_outcome_marks_every_column_as_separator() {
        let target = [1.0, 1.0, 1.0, 1.0];
        let rows = [[1.0, 2.0, 3.0], [1.0, 4.0, 5.0], [1.0, 6.0, 7.0], [1.0, 8.0, 9.0]];

        let report = diagnose_table("mem".into(), &table(&rows, &target), 0.5, 1, 42).unwrap();
        let flagged: Vec<&str> = report
            .suspected_separators
            .iter()
            .map(|s| s.column.as_str())
            .collect();
        assert_eq!(flagged, vec!["copy", "flat", "noise"]);
        assert_eq!(report.suspected_separators[1].unique_per_class.get(&1), Some(&4));
    }

    #[test]
    fn test_two_class_columns_are_not_separators() {
        let target = [0.0, 1.0, 0.0, 1.0];
        let rows = [[0.0, 1.0, 1.0], [1.0, 1.0, 2.0], [0.0, 1.0, 3.0], [1.0, 1.0, 4.0]];

        let report = diagnose_table("mem".into(), &table(&rows, &target), 0.5, 1, 42).unwrap();
        assert!(report.suspected_separators.is_empty());
    }

    #[test]
    fn test_repeated_rows_counted_across_split() {
        let target = [0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0];
        let rows = [
            [5.0, 1.0, 1.0],
            [6.0, 2.0, 2.0],
            [5.0, 1.0, 1.0],
            [6.0, 2.0, 2.0],
            [5.0, 1.0, 1.0],
            [6.0, 2.0, 2.0],
            [5.0, 1.0, 1.0],
            [6.0, 2.0, 2.0],
        ];
        let report = diagnose_table("mem".into(), &table(&rows, &target), 0.25, 3, 42).unwrap();

        assert_eq!(report.duplicate_rows, 6);
        // 2 test rows, each matching the 3 identical train rows of its class
        assert_eq!(report.train_test_overlap, 6);
    }
}
