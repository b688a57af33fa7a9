//! Training and selection pipeline
//!
//! Stages run in a fixed order: load, cross-validate the registry, search the
//! searchable candidates, rank, evaluate the winner on a holdout split, and
//! persist it. Every stage takes the same immutable [`RunConfig`].

pub mod config;
pub mod evaluator;
pub mod holdout;
pub mod registry;
pub mod runner;
pub mod selector;
pub mod tuning;

pub use config::{RunConfig, RunSeeds};
pub use evaluator::{
    cross_validate, evaluate_candidate, evaluate_registry, CandidateFailure, EvaluationResult,
};
pub use holdout::{evaluate_holdout, HoldoutOutcome, HoldoutReport};
pub use registry::{
    default_candidates, forest_search_space, svm_search_space, CandidateRegistry, CandidateSpec,
    TUNED_SUFFIX,
};
pub use runner::{run_pipeline, run_with_dataset, DatasetSummary, RunSummary, SelectedModel};
pub use selector::{complete_results, rank, select_best, RankedEntry, Selection};
pub use tuning::{run_search, tune_candidate, TuningOutcome};
