//! Hyperparameter optimization module
//!
//! Uniform random search over finite value sets, with an optional wall-clock
//! budget. Each trial is scored by the caller's objective (cross-validated
//! accuracy in the selection pipeline).

mod config;
mod optimizer;
mod search_space;

pub use config::OptimizationConfig;
pub use optimizer::{RandomSearch, Scored, Study, TrialResult};
pub use search_space::{format_params, Parameter, ParameterValue, SearchSpace, TrialParams};
