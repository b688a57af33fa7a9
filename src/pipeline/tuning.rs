//! Hyperparameter search stage

use super::config::RunConfig;
use super::evaluator::{cross_validate, EvaluationResult};
use super::registry::{CandidateRegistry, CandidateSpec};
use crate::error::{Result, SelectError};
use crate::optimizer::{format_params, OptimizationConfig, RandomSearch, TrialParams};
use crate::training::CVSplit;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Summary of one candidate's search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningOutcome {
    pub base_name: String,
    pub tuned_name: String,
    pub best_params: TrialParams,
    /// Evaluation of the best configuration, named after the tuned candidate
    pub best_result: EvaluationResult,
    pub trials_run: usize,
    pub trials_completed: usize,
    pub budget_exhausted: bool,
}

/// Search one candidate's space.
///
/// Every trial is scored with the same fold partition as the base candidates.
/// Returns `Ok(None)` when no trial completed (all failed, or the budget ran out).
pub fn tune_candidate(
    candidate: &CandidateSpec,
    x: &Array2<f64>,
    y: &Array1<f64>,
    splits: &[CVSplit],
    config: OptimizationConfig,
) -> Result<Option<(CandidateSpec, TuningOutcome)>> {
    let space = candidate.search_space.clone().ok_or_else(|| {
        SelectError::ConfigError(format!("candidate '{}' has no search space", candidate.name))
    })?;

    let tuned_name = format!("{}{}", candidate.name, super::registry::TUNED_SUFFIX);
    let search = RandomSearch::new(config, space);

    let study = search.optimize(|params: &TrialParams| {
        let pipeline = candidate.pipeline.with_params(params)?;
        let scores = cross_validate(&pipeline, x, y, splits)?;
        Ok(EvaluationResult::from_scores(tuned_name.as_str(), scores))
    })?;

    let Some(best) = study.best_trial() else {
        return Ok(None);
    };
    let Some(best_result) = best.outcome.clone() else {
        return Ok(None);
    };

    let tuned = candidate.tuned(&best.params)?;
    let outcome = TuningOutcome {
        base_name: candidate.name.clone(),
        tuned_name: tuned.name.clone(),
        best_params: best.params.clone(),
        best_result,
        trials_run: study.trials.len(),
        trials_completed: study.n_completed(),
        budget_exhausted: study.budget_exhausted,
    };

    Ok(Some((tuned, outcome)))
}

/// Search every searchable base candidate and register the tuned variants.
///
/// Base candidates are never modified; each tuned variant is appended to the
/// registry and its best evaluation appended to `results`.
pub fn run_search(
    registry: &mut CandidateRegistry,
    results: &mut Vec<EvaluationResult>,
    x: &Array2<f64>,
    y: &Array1<f64>,
    splits: &[CVSplit],
    config: &RunConfig,
) -> Vec<TuningOutcome> {
    let seeds = config.seeds();
    let searchable: Vec<CandidateSpec> = registry
        .iter()
        .filter(|c| c.is_searchable())
        .cloned()
        .collect();

    let mut outcomes = Vec::new();
    for candidate in searchable {
        let opt_config = OptimizationConfig::new()
            .with_n_trials(config.search_iterations)
            .with_timeout(config.search_budget_secs)
            .with_random_state(seeds.search(&candidate.name));

        info!(candidate = %candidate.name, trials = config.search_iterations, "Tuning");

        match tune_candidate(&candidate, x, y, splits, opt_config) {
            Ok(Some((tuned, outcome))) => {
                if let Err(e) = registry.register(tuned) {
                    warn!(candidate = %candidate.name, error = %e, "Tuned candidate not registered");
                    continue;
                }
                info!(
                    candidate = %outcome.tuned_name,
                    mean = outcome.best_result.mean,
                    params = %format_params(&outcome.best_params),
                    trials = outcome.trials_completed,
                    "Best configuration found"
                );
                results.push(outcome.best_result.clone());
                outcomes.push(outcome);
            }
            Ok(None) => {
                warn!(candidate = %candidate.name, "No search trial completed; candidate left untuned");
            }
            Err(e) => {
                warn!(candidate = %candidate.name, error = %e, "Search failed; candidate left untuned");
            }
        }
    }

    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::registry::default_candidates;
    use crate::training::StratifiedKFold;
    use ndarray::Array;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn synthetic(n: usize) -> (Array2<f64>, Array1<f64>) {
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let y: Array1<f64> = (0..n).map(|i| (i % 2) as f64).collect();
        let x = Array::from_shape_fn((n, 3), |(i, j)| {
            rng.gen_range(-1.0..1.0) + if j == 0 { y[i] } else { 0.0 }
        });
        (x, y)
    }

    #[test]
    fn test_tuned_candidate_holds_best_trial_score() {
        let (x, y) = synthetic(60);
        let splits = StratifiedKFold::new(3).with_random_state(2).split(&y).unwrap();
        let registry = default_candidates(42);
        let svm = registry.get("SVM").unwrap();

        let config = OptimizationConfig::new().with_n_trials(6).with_random_state(5);
        let (tuned, outcome) = tune_candidate(svm, &x, &y, &splits, config.clone())
            .unwrap()
            .unwrap();

        assert_eq!(tuned.name, "SVM (tuned)");
        assert_eq!(outcome.trials_run, 6);

        // Recompute every trial and check the kept one has the maximum mean
        let space = svm.search_space.clone().unwrap();
        let study = RandomSearch::new(config, space)
            .optimize(|p: &TrialParams| {
                let scores = cross_validate(&svm.pipeline.with_params(p)?, &x, &y, &splits)?;
                Ok(EvaluationResult::from_scores("replay", scores))
            })
            .unwrap();
        let max_mean = study
            .trials
            .iter()
            .map(|t| t.value)
            .fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(outcome.best_result.mean, max_mean);
        assert_eq!(outcome.best_result.candidate_name, "SVM (tuned)");
    }

    #[test]
    fn test_run_search_appends_without_replacing() {
        let (x, y) = synthetic(48);
        let splits = StratifiedKFold::new(3).with_random_state(2).split(&y).unwrap();
        let mut registry = default_candidates(42);
        let mut results = Vec::new();
        let config = RunConfig::default().with_search_iterations(2);

        let outcomes = run_search(&mut registry, &mut results, &x, &y, &splits, &config);

        assert_eq!(outcomes.len(), 2);
        assert_eq!(
            registry.names(),
            vec![
                "Logistic Regression",
                "SVM",
                "KNN",
                "Random Forest",
                "SVM (tuned)",
                "Random Forest (tuned)"
            ]
        );
        assert_eq!(results.len(), 2);
    }
}
