//! Optimization configuration

use serde::{Deserialize, Serialize};

/// Configuration for randomized hyperparameter search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationConfig {
    /// Number of trials to run
    pub n_trials: usize,

    /// Wall-clock budget in seconds; sampling stops once exceeded
    pub timeout_secs: Option<f64>,

    /// Seed of the sampling generator
    pub random_state: u64,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            n_trials: 20,
            timeout_secs: None,
            random_state: 42,
        }
    }
}

impl OptimizationConfig {
    /// Create a new configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set number of trials
    pub fn with_n_trials(mut self, n: usize) -> Self {
        self.n_trials = n;
        self
    }

    /// Builder method to set timeout
    pub fn with_timeout(mut self, secs: Option<f64>) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Builder method to set the sampling seed
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OptimizationConfig::default();
        assert_eq!(config.n_trials, 20);
        assert!(config.timeout_secs.is_none());
    }

    #[test]
    fn test_builder() {
        let config = OptimizationConfig::new()
            .with_n_trials(50)
            .with_timeout(Some(1.5))
            .with_random_state(7);

        assert_eq!(config.n_trials, 50);
        assert_eq!(config.timeout_secs, Some(1.5));
        assert_eq!(config.random_state, 7);
    }
}
