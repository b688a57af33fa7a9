//! Randomized hyperparameter search

use super::{
    config::OptimizationConfig,
    search_space::{format_params, SearchSpace, TrialParams},
};
use crate::error::Result;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Anything a trial can produce that carries a score to maximise
pub trait Scored {
    fn score(&self) -> f64;
}

impl Scored for f64 {
    fn score(&self) -> f64 {
        *self
    }
}

/// Result of a single trial
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialResult<T> {
    /// Trial number
    pub trial_id: usize,
    /// Parameters used
    pub params: TrialParams,
    /// Objective value (negative infinity for pruned trials)
    pub value: f64,
    /// Trial duration in seconds
    pub duration_secs: f64,
    /// Whether the objective failed for this configuration
    pub pruned: bool,
    /// Objective output for completed trials
    pub outcome: Option<T>,
}

/// Study containing all trials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Study<T> {
    /// All trial results
    pub trials: Vec<TrialResult<T>>,
    /// Best trial index
    pub best_trial_idx: Option<usize>,
    /// Total duration
    pub total_duration_secs: f64,
    /// Whether the time budget cut sampling short
    pub budget_exhausted: bool,
}

impl<T> Study<T> {
    pub fn new() -> Self {
        Self {
            trials: Vec::new(),
            best_trial_idx: None,
            total_duration_secs: 0.0,
            budget_exhausted: false,
        }
    }

    /// Get the best trial
    pub fn best_trial(&self) -> Option<&TrialResult<T>> {
        self.best_trial_idx.map(|idx| &self.trials[idx])
    }

    /// Get the best value
    pub fn best_value(&self) -> Option<f64> {
        self.best_trial().map(|t| t.value)
    }

    /// Get the best parameters
    pub fn best_params(&self) -> Option<&TrialParams> {
        self.best_trial().map(|t| &t.params)
    }

    pub fn n_completed(&self) -> usize {
        self.trials.iter().filter(|t| !t.pruned).count()
    }

    /// Add a trial result. Only a strictly higher value replaces the best,
    /// so the first-seen configuration wins exact ties.
    pub fn add_trial(&mut self, result: TrialResult<T>) {
        let idx = self.trials.len();

        let is_better = !result.pruned
            && match self.best_trial_idx {
                None => true,
                Some(best_idx) => result.value > self.trials[best_idx].value,
            };

        if is_better {
            self.best_trial_idx = Some(idx);
        }

        self.trials.push(result);
    }
}

impl<T> Default for Study<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Uniform random search over a finite search space
pub struct RandomSearch {
    config: OptimizationConfig,
    search_space: SearchSpace,
}

impl RandomSearch {
    /// Create a new optimizer
    pub fn new(config: OptimizationConfig, search_space: SearchSpace) -> Self {
        Self {
            config,
            search_space,
        }
    }

    pub fn config(&self) -> &OptimizationConfig {
        &self.config
    }

    /// Run the search, maximising the objective.
    ///
    /// Configurations are drawn from one generator seeded with `random_state`,
    /// so the sequence of sampled configurations is fixed by the seed. A failing
    /// objective marks its trial as pruned and the search continues. The time
    /// budget is checked before every trial after the first.
    pub fn optimize<T, F>(&self, mut objective: F) -> Result<Study<T>>
    where
        T: Scored,
        F: FnMut(&TrialParams) -> Result<T>,
    {
        let start = Instant::now();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);
        let mut study = Study::new();

        for trial_id in 0..self.config.n_trials {
            if let Some(t) = self.config.timeout_secs {
                if trial_id > 0 && start.elapsed().as_secs_f64() > t {
                    info!(trials = trial_id, budget_secs = t, "Search budget exhausted");
                    study.budget_exhausted = true;
                    break;
                }
            }

            let trial_start = Instant::now();
            let params = self.search_space.sample(&mut rng);

            let result = match objective(&params) {
                Ok(outcome) => TrialResult {
                    trial_id,
                    value: outcome.score(),
                    params,
                    duration_secs: trial_start.elapsed().as_secs_f64(),
                    pruned: false,
                    outcome: Some(outcome),
                },
                Err(e) => {
                    warn!(trial = trial_id, params = %format_params(&params), error = %e, "Trial failed");
                    TrialResult {
                        trial_id,
                        params,
                        value: f64::NEG_INFINITY,
                        duration_secs: trial_start.elapsed().as_secs_f64(),
                        pruned: true,
                        outcome: None,
                    }
                }
            };

            debug!(
                trial = trial_id,
                value = result.value,
                pruned = result.pruned,
                best = study.best_value().unwrap_or(result.value),
                "Trial finished"
            );

            study.add_trial(result);
        }

        study.total_duration_secs = start.elapsed().as_secs_f64();
        Ok(study)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SelectError;

    fn space() -> SearchSpace {
        SearchSpace::new()
            .floats("x", &[-2.0, -1.0, 0.0, 1.0, 2.0])
            .floats("y", &[-2.0, -1.0, 0.0, 1.0, 2.0])
    }

    fn neg_quadratic(params: &TrialParams) -> Result<f64> {
        let x = params["x"].as_float().unwrap_or(0.0);
        let y = params["y"].as_float().unwrap_or(0.0);
        Ok(-(x * x + y * y))
    }

    #[test]
    fn test_optimization_runs_all_trials() {
        let search = RandomSearch::new(OptimizationConfig::new().with_n_trials(20), space());
        let study = search.optimize(neg_quadratic).unwrap();

        assert_eq!(study.trials.len(), 20);
        let best = study.best_value().unwrap();
        let max_seen = study.trials.iter().map(|t| t.value).fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(best, max_seen);
    }

    #[test]
    fn test_first_seen_wins_ties() {
        let search = RandomSearch::new(OptimizationConfig::new().with_n_trials(10), space());
        let study = search.optimize(|_: &TrialParams| Ok(0.5)).unwrap();
        assert_eq!(study.best_trial_idx, Some(0));
    }

    #[test]
    fn test_same_seed_same_trials() {
        let config = OptimizationConfig::new().with_n_trials(8).with_random_state(11);
        let a = RandomSearch::new(config.clone(), space()).optimize(neg_quadratic).unwrap();
        let b = RandomSearch::new(config, space()).optimize(neg_quadratic).unwrap();

        let params_a: Vec<_> = a.trials.iter().map(|t| t.params.clone()).collect();
        let params_b: Vec<_> = b.trials.iter().map(|t| t.params.clone()).collect();
        assert_eq!(params_a, params_b);
    }

    #[test]
    fn test_failed_trials_are_pruned() {
        let search = RandomSearch::new(OptimizationConfig::new().with_n_trials(6), space());
        let mut calls = 0;
        let study = search
            .optimize(|_: &TrialParams| {
                calls += 1;
                if calls % 2 == 0 {
                    Err(SelectError::ValidationError("bad".into()))
                } else {
                    Ok(calls as f64)
                }
            })
            .unwrap();

        assert_eq!(study.n_completed(), 3);
        assert_eq!(study.best_value(), Some(5.0));
    }

    #[test]
    fn test_zero_budget_stops_sampling() {
        let config = OptimizationConfig::new().with_n_trials(50).with_timeout(Some(0.0));
        let study = RandomSearch::new(config, space())
            .optimize(|_: &TrialParams| {
                std::thread::sleep(std::time::Duration::from_millis(2));
                Ok(1.0)
            })
            .unwrap();

        // The first trial always runs, the budget check fails afterwards
        assert_eq!(study.trials.len(), 1);
        assert!(study.budget_exhausted);
    }
}
