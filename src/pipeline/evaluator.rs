//! Cross-validated scoring of candidates

use super::registry::{CandidateRegistry, CandidateSpec};
use crate::error::{Result, SelectError};
use crate::optimizer::Scored;
use crate::training::{CVSplit, PipelineSpec};
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Fold accuracies of one candidate under one fold partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub candidate_name: String,
    pub fold_scores: Vec<f64>,
    pub mean: f64,
    /// Population standard deviation of `fold_scores`
    pub std: f64,
}

impl EvaluationResult {
    pub fn from_scores(candidate_name: impl Into<String>, fold_scores: Vec<f64>) -> Self {
        let n = fold_scores.len().max(1) as f64;
        let mean = fold_scores.iter().sum::<f64>() / n;
        let variance = fold_scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;

        Self {
            candidate_name: candidate_name.into(),
            fold_scores,
            mean,
            std: variance.sqrt(),
        }
    }

    pub fn n_folds(&self) -> usize {
        self.fold_scores.len()
    }
}

impl Scored for EvaluationResult {
    fn score(&self) -> f64 {
        self.mean
    }
}

/// A candidate dropped from ranking because it could not be scored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateFailure {
    pub candidate_name: String,
    pub reason: String,
}

/// Fit on each split's train rows and score accuracy on its test rows.
/// Folds run in parallel; scores come back in split order.
pub fn cross_validate(
    pipeline: &PipelineSpec,
    x: &Array2<f64>,
    y: &Array1<f64>,
    splits: &[CVSplit],
) -> Result<Vec<f64>> {
    splits
        .par_iter()
        .map(|split| {
            let x_train = x.select(Axis(0), &split.train_indices);
            let y_train = y.select(Axis(0), &split.train_indices);
            let x_test = x.select(Axis(0), &split.test_indices);
            let y_test = y.select(Axis(0), &split.test_indices);

            let fitted = pipeline.fit(&x_train, &y_train).map_err(|e| {
                SelectError::ValidationError(format!("fold {}: {}", split.fold_idx, e))
            })?;
            fitted.score(&x_test, &y_test)
        })
        .collect()
}

/// Cross-validate one candidate; any fold error becomes a `FitFailure` naming it
pub fn evaluate_candidate(
    candidate: &CandidateSpec,
    x: &Array2<f64>,
    y: &Array1<f64>,
    splits: &[CVSplit],
) -> Result<EvaluationResult> {
    let scores = cross_validate(&candidate.pipeline, x, y, splits)
        .map_err(|e| SelectError::fit_failure(&candidate.name, e))?;
    Ok(EvaluationResult::from_scores(&candidate.name, scores))
}

/// Score every registered candidate in parallel.
///
/// Returns results in registry order; candidates that fail are logged and
/// reported separately instead of aborting the run.
pub fn evaluate_registry(
    registry: &CandidateRegistry,
    x: &Array2<f64>,
    y: &Array1<f64>,
    splits: &[CVSplit],
) -> (Vec<EvaluationResult>, Vec<CandidateFailure>) {
    let outcomes: Vec<Result<EvaluationResult>> = registry
        .candidates()
        .par_iter()
        .map(|candidate| evaluate_candidate(candidate, x, y, splits))
        .collect();

    let mut results = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();

    for (candidate, outcome) in registry.iter().zip(outcomes) {
        match outcome {
            Ok(result) => {
                info!(
                    candidate = %candidate.name,
                    kind = %candidate.kind(),
                    mean = result.mean,
                    std = result.std,
                    "Cross-validated"
                );
                results.push(result);
            }
            Err(e) => {
                warn!(candidate = %candidate.name, error = %e, "Candidate excluded from ranking");
                failures.push(CandidateFailure {
                    candidate_name: candidate.name.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    (results, failures)
}
