//! Run configuration

use crate::error::{Result, SelectError};
use crate::utils::derive_seed;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Immutable settings of one training run, passed to every stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Tabular input file
    pub data_path: PathBuf,
    /// Name of the 0/1 outcome column
    pub target_column: String,
    /// Seed every stage seed is derived from
    pub random_seed: u64,
    /// Fraction of rows held out for the final evaluation
    pub test_size: f64,
    /// Number of cross-validation folds
    pub cv_folds: usize,
    /// Run the hyperparameter search stage
    pub search_enabled: bool,
    /// Sampled configurations per searched candidate
    pub search_iterations: usize,
    /// Wall-clock budget per searched candidate
    pub search_budget_secs: Option<f64>,
    /// Serialized fitted pipeline
    pub model_output: PathBuf,
    /// Serialized metadata record
    pub metadata_output: PathBuf,
    /// Worker threads; rayon's global pool when `None`
    pub n_jobs: Option<usize>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("heart.csv"),
            target_column: "target".to_string(),
            random_seed: 42,
            test_size: 0.20,
            cv_folds: 5,
            search_enabled: true,
            search_iterations: 20,
            search_budget_secs: None,
            model_output: PathBuf::from("pipeline.bin"),
            metadata_output: PathBuf::from("pipeline_metadata.bin"),
            n_jobs: None,
        }
    }
}

impl RunConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON file; absent keys keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            SelectError::ConfigError(format!("cannot read config {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            SelectError::ConfigError(format!("invalid config {}: {}", path.display(), e))
        })
    }

    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = path.into();
        self
    }

    pub fn with_target_column(mut self, name: impl Into<String>) -> Self {
        self.target_column = name.into();
        self
    }

    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_search(mut self, enabled: bool) -> Self {
        self.search_enabled = enabled;
        self
    }

    pub fn with_search_iterations(mut self, n: usize) -> Self {
        self.search_iterations = n;
        self
    }

    pub fn with_search_budget(mut self, secs: Option<f64>) -> Self {
        self.search_budget_secs = secs;
        self
    }

    pub fn with_outputs(mut self, model: impl Into<PathBuf>, metadata: impl Into<PathBuf>) -> Self {
        self.model_output = model.into();
        self.metadata_output = metadata.into();
        self
    }

    pub fn with_n_jobs(mut self, n_jobs: Option<usize>) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    /// Reject settings no stage can run with
    pub fn validate(&self) -> Result<()> {
        if self.cv_folds < 2 {
            return Err(SelectError::ConfigError(format!(
                "cv_folds must be at least 2, got {}",
                self.cv_folds
            )));
        }
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(SelectError::ConfigError(format!(
                "test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }
        if self.target_column.trim().is_empty() {
            return Err(SelectError::ConfigError("target_column is empty".to_string()));
        }
        if self.model_output == self.metadata_output {
            return Err(SelectError::ConfigError(format!(
                "model and metadata outputs share the path {}",
                self.model_output.display()
            )));
        }
        if let Some(budget) = self.search_budget_secs {
            if !(budget >= 0.0) {
                return Err(SelectError::ConfigError(format!(
                    "search_budget_secs must be non-negative, got {}",
                    budget
                )));
            }
        }
        if self.n_jobs == Some(0) {
            return Err(SelectError::ConfigError("n_jobs must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn seeds(&self) -> RunSeeds {
        RunSeeds::new(self.random_seed)
    }
}

/// Independent per-stage seeds derived from the run seed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSeeds {
    /// Run seed; also seeds model-internal randomness
    pub base: u64,
    /// Fold partition shared by every candidate and trial
    pub cv: u64,
    /// Train/test split
    pub holdout: u64,
}

impl RunSeeds {
    pub fn new(base: u64) -> Self {
        Self {
            base,
            cv: derive_seed(base, "cv"),
            holdout: derive_seed(base, "holdout"),
        }
    }

    /// Sampling seed for one candidate's search
    pub fn search(&self, candidate: &str) -> u64 {
        derive_seed(self.base, &format!("search:{}", candidate))
    }
}
