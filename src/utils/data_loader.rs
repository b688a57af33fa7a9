//! Dataset loading, numeric coercion and deduplication

use crate::error::{Result, SelectError};
use ndarray::{Array1, Array2, Axis};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

/// Loader for tabular files with a binary outcome column
#[derive(Debug, Clone)]
pub struct DataLoader {
    /// Outcome column name
    target_column: String,
    /// Rows used by polars for schema inference; `None` scans the whole file
    infer_schema_length: Option<usize>,
}

impl DataLoader {
    /// Create a new loader for the given outcome column
    pub fn new(target_column: impl Into<String>) -> Self {
        Self {
            target_column: target_column.into(),
            infer_schema_length: None,
        }
    }

    /// Set the schema inference window (None scans the whole file)
    pub fn with_infer_schema_length(mut self, rows: Option<usize>) -> Self {
        self.infer_schema_length = rows;
        self
    }

    /// Outcome column this loader separates from the features
    pub fn target_column(&self) -> &str {
        &self.target_column
    }

    /// Read the raw CSV file into a DataFrame
    pub fn read_frame(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(SelectError::DataNotFound(path.display().to_string()));
        }

        let file = File::open(path)
            .map_err(|e| SelectError::DataNotFound(format!("{}: {}", path.display(), e)))?;

        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.infer_schema_length)
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| SelectError::DataError(e.to_string()))
    }

    /// Coerce every column to f64 and split features from the outcome.
    ///
    /// Feature order follows the file's column order with the outcome removed.
    pub fn numeric_table(&self, df: &DataFrame) -> Result<NumericTable> {
        let names: Vec<String> = df
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect();

        if !names.iter().any(|n| n == &self.target_column) {
            return Err(SelectError::SchemaError(format!(
                "expected a column named '{}' in the dataset (found: {})",
                self.target_column,
                names.join(", ")
            )));
        }

        let feature_names: Vec<String> = names
            .iter()
            .filter(|n| *n != &self.target_column)
            .cloned()
            .collect();

        if feature_names.is_empty() {
            return Err(SelectError::SchemaError(
                "dataset has no feature columns besides the outcome".to_string(),
            ));
        }

        let n_rows = df.height();
        let mut features = Array2::zeros((n_rows, feature_names.len()));
        for (j, name) in feature_names.iter().enumerate() {
            let values = column_as_f64(df, name)?;
            features.column_mut(j).assign(&Array1::from_vec(values));
        }

        let target_values = column_as_f64(df, &self.target_column)?;
        if let Some(bad) = target_values.iter().find(|v| **v != 0.0 && **v != 1.0) {
            return Err(SelectError::SchemaError(format!(
                "outcome column '{}' must be binary 0/1, found value {}",
                self.target_column, bad
            )));
        }

        Ok(NumericTable {
            feature_names,
            features,
            target: Array1::from_vec(target_values),
        })
    }

    /// Load, coerce and deduplicate a dataset
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Dataset> {
        let path = path.as_ref();
        let df = self.read_frame(path)?;
        let table = self.numeric_table(&df)?;
        let original_rows = table.n_rows();
        let (table, removed) = table.dedup();

        info!(
            path = %path.display(),
            rows = original_rows,
            duplicates_removed = removed,
            features = table.feature_names.len(),
            "Dataset loaded"
        );

        Ok(Dataset {
            source_path: path.display().to_string(),
            feature_names: table.feature_names,
            features: table.features,
            target: table.target,
            duplicates_removed: removed,
        })
    }
}

fn column_as_f64(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(name)
        .map_err(|_| SelectError::SchemaError(format!("column '{}' not found", name)))?;
    let series = column.as_materialized_series();
    let missing = series.null_count();

    let casted = series
        .cast(&DataType::Float64)
        .map_err(|e| SelectError::SchemaError(format!("column '{}' is not numeric: {}", name, e)))?;

    if casted.null_count() > missing {
        return Err(SelectError::SchemaError(format!(
            "column '{}' contains non-numeric values",
            name
        )));
    }
    if missing > 0 {
        return Err(SelectError::SchemaError(format!(
            "column '{}' contains {} missing values",
            name, missing
        )));
    }

    let ca = casted.f64().map_err(|e| SelectError::DataError(e.to_string()))?;
    Ok(ca.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

/// Bit-exact key of a full row, outcome included.
fn row_key(features: ndarray::ArrayView1<f64>, target: f64) -> Vec<u64> {
    features
        .iter()
        .chain(std::iter::once(&target))
        // -0.0 and 0.0 compare equal in the source data
        .map(|v| if *v == 0.0 { 0u64 } else { v.to_bits() })
        .collect()
}

/// Numeric view of a table before deduplication
#[derive(Debug, Clone)]
pub struct NumericTable {
    pub feature_names: Vec<String>,
    pub features: Array2<f64>,
    pub target: Array1<f64>,
}

impl NumericTable {
    pub fn n_rows(&self) -> usize {
        self.features.nrows()
    }

    /// Row indices that repeat an earlier row exactly
    pub fn duplicate_rows(&self) -> Vec<usize> {
        let mut seen: HashSet<Vec<u64>> = HashSet::with_capacity(self.n_rows());
        (0..self.n_rows())
            .filter(|&i| !seen.insert(row_key(self.features.row(i), self.target[i])))
            .collect()
    }

    /// Remove exact repeats, keeping the first occurrence of each row
    pub fn dedup(self) -> (Self, usize) {
        let duplicates: HashSet<usize> = self.duplicate_rows().into_iter().collect();
        if duplicates.is_empty() {
            return (self, 0);
        }

        let keep: Vec<usize> = (0..self.n_rows()).filter(|i| !duplicates.contains(i)).collect();
        debug!(kept = keep.len(), removed = duplicates.len(), "Deduplicated rows");

        let table = Self {
            feature_names: self.feature_names,
            features: self.features.select(Axis(0), &keep),
            target: self.target.select(Axis(0), &keep),
        };
        (table, duplicates.len())
    }
}

/// Deduplicated dataset ready for training
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    /// Path the data was read from
    pub source_path: String,
    /// Feature column names in training order
    pub feature_names: Vec<String>,
    /// Feature matrix (rows x features)
    pub features: Array2<f64>,
    /// Outcome labels (0.0 / 1.0)
    pub target: Array1<f64>,
    /// Exact duplicate rows dropped while loading
    pub duplicates_removed: usize,
}

impl Dataset {
    /// Build a dataset from in-memory arrays, deduplicating like [`DataLoader::load`]
    pub fn from_arrays(
        source_path: impl Into<String>,
        feature_names: Vec<String>,
        features: Array2<f64>,
        target: Array1<f64>,
    ) -> Result<Self> {
        if features.nrows() != target.len() {
            return Err(SelectError::ShapeError {
                expected: format!("{} outcome values", features.nrows()),
                actual: format!("{} outcome values", target.len()),
            });
        }
        if features.ncols() != feature_names.len() {
            return Err(SelectError::ShapeError {
                expected: format!("{} feature names", features.ncols()),
                actual: format!("{} feature names", feature_names.len()),
            });
        }

        let (table, removed) = NumericTable {
            feature_names,
            features,
            target,
        }
        .dedup();

        Ok(Self {
            source_path: source_path.into(),
            feature_names: table.feature_names,
            features: table.features,
            target: table.target,
            duplicates_removed: removed,
        })
    }

    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    /// Number of rows per outcome label
    pub fn class_counts(&self) -> BTreeMap<i64, usize> {
        class_counts(&self.target)
    }
}

/// Number of rows per label, ordered by label
pub fn class_counts(y: &Array1<f64>) -> BTreeMap<i64, usize> {
    let mut counts = BTreeMap::new();
    for &v in y.iter() {
        *counts.entry(v.round() as i64).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(dir: &tempfile::TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_removes_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "heart.csv",
            "age,chol,target\n63,233,1\n37,250,0\n63,233,1\n41,204,0\n63,233,0\n",
        );

        let dataset = DataLoader::new("target").load(&path).unwrap();

        assert_eq!(dataset.duplicates_removed, 1);
        assert_eq!(dataset.n_samples(), 4);
        assert_eq!(dataset.feature_names, vec!["age".to_string(), "chol".to_string()]);
        // Same features with a different outcome is not a duplicate
        assert_eq!(dataset.target.to_vec(), vec![1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_dedup_is_idempotent() {
        let x = ndarray::array![[1.0, 2.0], [1.0, 2.0], [3.0, 4.0]];
        let y = ndarray::array![0.0, 0.0, 1.0];
        let dataset = Dataset::from_arrays("mem", vec!["a".into(), "b".into()], x, y).unwrap();
        assert_eq!(dataset.duplicates_removed, 1);

        let again = Dataset::from_arrays(
            "mem",
            dataset.feature_names.clone(),
            dataset.features.clone(),
            dataset.target.clone(),
        )
        .unwrap();
        assert_eq!(again.duplicates_removed, 0);
        assert_eq!(again.n_samples(), dataset.n_samples());
    }

    #[test]
    fn test_late_decimal_values_are_coerced() {
        let dir = tempfile::tempdir().unwrap();
        let mut body = String::from("age,oldpeak,target\n");
        for i in 0..150 {
            let oldpeak = if i < 120 { format!("{}", i % 4) } else { format!("{}.5", i % 4) };
            body.push_str(&format!("{},{},{}\n", 30 + i, oldpeak, i % 2));
        }
        let path = write_csv(&dir, "late_float.csv", &body);

        let dataset = DataLoader::new("target").load(&path).unwrap();
        assert_eq!(dataset.n_samples(), 150);
        assert_eq!(dataset.features[[0, 1]], 0.0);
        assert_eq!(dataset.features[[121, 1]], 1.5);
    }

    #[test]
    fn test_missing_file() {
        let err = DataLoader::new("target").load("/nonexistent/heart.csv").unwrap_err();
        assert!(matches!(err, SelectError::DataNotFound(_)));
    }

    #[test]
    fn test_missing_target_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "no_target.csv", "age,chol\n63,233\n37,250\n");

        let err = DataLoader::new("target").load(&path).unwrap_err();
        assert!(matches!(err, SelectError::SchemaError(_)));
    }

    #[test]
    fn test_non_binary_target_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "multi.csv", "age,target\n63,1\n37,2\n");

        let err = DataLoader::new("target").load(&path).unwrap_err();
        assert!(matches!(err, SelectError::SchemaError(_)));
    }

    #[test]
    fn test_non_numeric_feature_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "text.csv", "age,sex,target\n63,male,1\n37,female,0\n");

        let err = DataLoader::new("target").load(&path).unwrap_err();
        assert!(matches!(err, SelectError::SchemaError(_)));
    }

    #[test]
    fn test_class_counts() {
        let y = ndarray::array![0.0, 1.0, 1.0, 0.0, 1.0];
        let counts = class_counts(&y);
        assert_eq!(counts.get(&0), Some(&2));
        assert_eq!(counts.get(&1), Some(&3));
    }
}
