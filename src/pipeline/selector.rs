//! Ranking and selection

use super::evaluator::{evaluate_candidate, CandidateFailure, EvaluationResult};
use super::registry::{CandidateRegistry, CandidateSpec};
use crate::error::{Result, SelectError};
use crate::training::CVSplit;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// One row of the ranked table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub name: String,
    pub mean: f64,
    pub std: f64,
    /// Registry insertion index
    pub index: usize,
}

/// Outcome of the selection stage
#[derive(Debug, Clone)]
pub struct Selection {
    pub candidate: CandidateSpec,
    pub result: EvaluationResult,
    /// Every scored candidate, best first
    pub ranking: Vec<RankedEntry>,
}

/// Score registered candidates that have no evaluation yet.
///
/// Candidates already in `failed` are not retried. New failures are logged and
/// left out; the returned results follow registry order.
pub fn complete_results(
    registry: &CandidateRegistry,
    mut results: Vec<EvaluationResult>,
    failed: &[CandidateFailure],
    x: &Array2<f64>,
    y: &Array1<f64>,
    splits: &[CVSplit],
) -> Vec<EvaluationResult> {
    for candidate in registry.iter() {
        if results.iter().any(|r| r.candidate_name == candidate.name)
            || failed.iter().any(|f| f.candidate_name == candidate.name)
        {
            continue;
        }
        match evaluate_candidate(candidate, x, y, splits) {
            Ok(result) => {
                info!(candidate = %candidate.name, mean = result.mean, "Late evaluation");
                results.push(result);
            }
            Err(e) => warn!(candidate = %candidate.name, error = %e, "Candidate excluded from ranking"),
        }
    }

    results.sort_by_key(|r| registry.index_of(&r.candidate_name).unwrap_or(usize::MAX));
    results
}

/// Rank results by mean descending. The sort is stable over registry order,
/// so equal means keep the earlier-registered candidate first.
pub fn rank(registry: &CandidateRegistry, results: &[EvaluationResult]) -> Vec<RankedEntry> {
    let mut entries: Vec<RankedEntry> = results
        .iter()
        .filter_map(|r| {
            registry.index_of(&r.candidate_name).map(|index| RankedEntry {
                name: r.candidate_name.clone(),
                mean: r.mean,
                std: r.std,
                index,
            })
        })
        .collect();

    entries.sort_by_key(|e| e.index);
    entries.sort_by(|a, b| b.mean.total_cmp(&a.mean));
    entries
}

/// Pick the candidate with the highest mean score
pub fn select_best(registry: &CandidateRegistry, results: &[EvaluationResult]) -> Result<Selection> {
    let ranking = rank(registry, results);
    let best = ranking.first().ok_or_else(|| {
        SelectError::ValidationError("no candidate produced a cross-validation score".to_string())
    })?;

    let candidate = registry.candidates()[best.index].clone();
    let result = results
        .iter()
        .find(|r| r.candidate_name == best.name)
        .cloned()
        .ok_or_else(|| SelectError::ValidationError(format!("no result for '{}'", best.name)))?;

    info!(
        candidate = %candidate.name,
        mean = result.mean,
        std = result.std,
        "Selected model"
    );

    Ok(Selection {
        candidate,
        result,
        ranking,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::registry::default_candidates;

    fn result(name: &str, scores: &[f64]) -> EvaluationResult {
        EvaluationResult::from_scores(name, scores.to_vec())
    }

    #[test]
    fn test_highest_mean_wins() {
        let registry = default_candidates(42);
        let results = vec![
            result("Logistic Regression", &[0.80, 0.82]),
            result("SVM", &[0.85, 0.87]),
            result("KNN", &[0.70, 0.72]),
            result("Random Forest", &[0.84, 0.86]),
        ];

        let selection = select_best(&registry, &results).unwrap();
        assert_eq!(selection.candidate.name, "SVM");
        let names: Vec<&str> = selection.ranking.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["SVM", "Random Forest", "Logistic Regression", "KNN"]);
        for entry in &selection.ranking {
            assert!(selection.result.mean >= entry.mean);
        }
    }

    #[test]
    fn test_tie_goes_to_earlier_registration() {
        let registry = default_candidates(42);
        // Results arrive out of registry order on purpose
        let results = vec![
            result("Random Forest", &[0.9, 0.9]),
            result("KNN", &[0.9, 0.9]),
            result("Logistic Regression", &[0.5, 0.5]),
        ];

        let selection = select_best(&registry, &results).unwrap();
        assert_eq!(selection.candidate.name, "KNN");
        assert_eq!(selection.ranking[1].name, "Random Forest");
    }

    #[test]
    fn test_completion_skips_failed_and_scores_missing() {
        use crate::pipeline::registry::CandidateSpec;
        use crate::training::{KNNConfig, ModelSpec, PipelineSpec, StratifiedKFold};

        let y: Array1<f64> = (0..20).map(|i| (i % 2) as f64).collect();
        let x = Array2::from_shape_fn((20, 2), |(i, j)| y[i] * 2.0 + (i * (j + 3) % 7) as f64 * 0.1);
        let splits = StratifiedKFold::new(2).with_random_state(1).split(&y).unwrap();

        let knn = |k| PipelineSpec::scaled(ModelSpec::KNNClassifier(KNNConfig { n_neighbors: k }));
        let mut registry = CandidateRegistry::new();
        registry.register(CandidateSpec::new("Small K", knn(3))).unwrap();
        registry.register(CandidateSpec::new("Mid K", knn(5))).unwrap();

        // "Small K" would score if evaluated; an earlier failure keeps it out
        let failed = vec![CandidateFailure {
            candidate_name: "Small K".to_string(),
            reason: "earlier fold failure".to_string(),
        }];
        let results = complete_results(&registry, Vec::new(), &failed, &x, &y, &splits);

        let names: Vec<&str> = results.iter().map(|r| r.candidate_name.as_str()).collect();
        assert_eq!(names, vec!["Mid K"]);
        assert_eq!(results[0].fold_scores.len(), 2);
    }

    #[test]
    fn test_empty_results_is_an_error() {
        let registry = default_candidates(42);
        assert!(select_best(&registry, &[]).is_err());
    }
}
