//! End-to-end training run

use super::config::RunConfig;
use super::evaluator::{evaluate_registry, CandidateFailure, EvaluationResult};
use super::holdout::{evaluate_holdout, HoldoutReport};
use super::registry::default_candidates;
use super::selector::{complete_results, select_best, RankedEntry};
use super::tuning::{run_search, TuningOutcome};
use crate::error::Result;
use crate::export::{check_writable, persist_artifacts, ArtifactMetadata};
use crate::training::{ClassifierKind, FittedPipeline, StratifiedKFold};
use crate::utils::{with_thread_pool, DataLoader, Dataset};
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// Shape of the training data after deduplication
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub source_path: String,
    pub n_samples: usize,
    pub n_features: usize,
    pub duplicates_removed: usize,
    pub class_counts: BTreeMap<i64, usize>,
}

impl DatasetSummary {
    pub fn of(dataset: &Dataset) -> Self {
        Self {
            source_path: dataset.source_path.clone(),
            n_samples: dataset.n_samples(),
            n_features: dataset.n_features(),
            duplicates_removed: dataset.duplicates_removed,
            class_counts: dataset.class_counts(),
        }
    }
}

/// The winning candidate, fitted on the train partition
#[derive(Debug, Clone, Serialize)]
pub struct SelectedModel {
    pub candidate_name: String,
    pub kind: ClassifierKind,
    #[serde(skip_serializing)]
    pub fitted_estimator: FittedPipeline,
    pub mean_cv_score: f64,
    pub std_cv_score: f64,
}

/// Everything a run observed, in reporting order
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub config: RunConfig,
    pub dataset: DatasetSummary,
    /// Base candidates' cross-validation, registry order
    pub evaluations: Vec<EvaluationResult>,
    pub failures: Vec<CandidateFailure>,
    pub tuning: Vec<TuningOutcome>,
    pub ranking: Vec<RankedEntry>,
    pub selected: SelectedModel,
    pub holdout: HoldoutReport,
    pub metadata: ArtifactMetadata,
    pub model_path: PathBuf,
    pub metadata_path: PathBuf,
    pub duration_secs: f64,
}

/// Validate the configuration, load the dataset and run every stage.
///
/// Configuration, data and output-directory problems surface before any
/// candidate is trained.
pub fn run_pipeline(config: &RunConfig) -> Result<RunSummary> {
    preflight(config)?;
    let dataset = DataLoader::new(config.target_column.as_str()).load(&config.data_path)?;
    with_thread_pool(config.n_jobs, || run_stages(config, &dataset))?
}

/// Run every stage on an already loaded dataset and persist the winner.
/// Output directories are checked before any candidate is trained.
pub fn run_with_dataset(config: &RunConfig, dataset: &Dataset) -> Result<RunSummary> {
    preflight(config)?;
    with_thread_pool(config.n_jobs, || run_stages(config, dataset))?
}

fn preflight(config: &RunConfig) -> Result<()> {
    config.validate()?;
    check_writable(&config.model_output)?;
    check_writable(&config.metadata_output)
}

fn run_stages(config: &RunConfig, dataset: &Dataset) -> Result<RunSummary> {
    let start = Instant::now();
    let seeds = config.seeds();
    let (x, y) = (&dataset.features, &dataset.target);

    info!(
        samples = dataset.n_samples(),
        features = dataset.n_features(),
        folds = config.cv_folds,
        seed = config.random_seed,
        "Starting run"
    );

    let splits = StratifiedKFold::new(config.cv_folds)
        .with_random_state(seeds.cv)
        .split(y)?;

    let mut registry = default_candidates(config.random_seed);
    let (evaluations, failures) = evaluate_registry(&registry, x, y, &splits);

    let mut results = evaluations.clone();
    let tuning = if config.search_enabled {
        run_search(&mut registry, &mut results, x, y, &splits, config)
    } else {
        Vec::new()
    };

    let results = complete_results(&registry, results, &failures, x, y, &splits);
    let selection = select_best(&registry, &results)?;
    let holdout = evaluate_holdout(&selection.candidate, x, y, config)?;

    let metadata = ArtifactMetadata {
        timestamp: Utc::now(),
        source_path: dataset.source_path.clone(),
        duplicate_rows_removed: dataset.duplicates_removed,
        feature_column_order: dataset.feature_names.clone(),
        selected_model_name: selection.candidate.name.clone(),
        cv_mean_accuracy: selection.result.mean,
        cv_std_accuracy: selection.result.std,
        train_accuracy: holdout.report.train_accuracy,
        test_accuracy: holdout.report.test_accuracy,
        cv_train_mean_accuracy: holdout.report.cv_train.mean,
        sample_count: dataset.n_samples(),
        random_seed: config.random_seed,
    };

    persist_artifacts(
        &holdout.fitted,
        &metadata,
        &config.model_output,
        &config.metadata_output,
    )?;

    let selected = SelectedModel {
        candidate_name: selection.candidate.name.clone(),
        kind: selection.candidate.kind(),
        fitted_estimator: holdout.fitted,
        mean_cv_score: selection.result.mean,
        std_cv_score: selection.result.std,
    };

    Ok(RunSummary {
        config: config.clone(),
        dataset: DatasetSummary::of(dataset),
        evaluations,
        failures,
        tuning,
        ranking: selection.ranking,
        selected,
        holdout: holdout.report,
        metadata,
        model_path: config.model_output.clone(),
        metadata_path: config.metadata_output.clone(),
        duration_secs: start.elapsed().as_secs_f64(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SelectError;
    use ndarray::{Array1, Array2};

    fn in_memory() -> Dataset {
        let target: Array1<f64> = (0..30).map(|i| (i % 2) as f64).collect();
        let features = Array2::from_shape_fn((30, 2), |(i, j)| target[i] + (i * (j + 2)) as f64 * 0.01);
        Dataset::from_arrays("memory", vec!["a".into(), "b".into()], features, target).unwrap()
    }

    #[test]
    fn test_in_memory_run_rejects_unwritable_output() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig::default().with_outputs(
            dir.path().join("missing").join("pipeline.bin"),
            dir.path().join("pipeline_metadata.bin"),
        );

        let err = run_with_dataset(&config, &in_memory()).unwrap_err();
        assert!(matches!(err, SelectError::PersistenceFailure { .. }), "got {:?}", err);
        assert!(!config.metadata_output.exists());
    }

    #[test]
    fn test_in_memory_run_persists_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig::default()
            .with_outputs(dir.path().join("pipeline.bin"), dir.path().join("pipeline_metadata.bin"))
            .with_cv_folds(3)
            .with_search(false);

        let summary = run_with_dataset(&config, &in_memory()).unwrap();
        assert_eq!(summary.dataset.n_samples, 30);
        assert!(config.model_output.exists());
        assert!(config.metadata_output.exists());
    }
}
