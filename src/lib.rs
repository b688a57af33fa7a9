//! automl-select - cross-validated model selection for binary tabular data
//!
//! Given a CSV file with a 0/1 outcome column, this crate scores a fixed set
//! of candidate pipelines by stratified k-fold cross-validation, optionally
//! tunes the searchable ones by randomized search, selects the best mean
//! accuracy, evaluates the winner once on a stratified holdout split and
//! writes the train-fitted pipeline plus a metadata record.
//!
//! # Modules
//!
//! ## Core ML Modules
//! - [`preprocessing`] - Feature scaling
//! - [`training`] - Classifiers, resampling and metrics
//! - [`calibration`] - Platt scaling of margin scores
//! - [`optimizer`] - Randomized hyperparameter search
//!
//! ## Pipeline
//! - [`pipeline`] - Registry, evaluation, search, selection and holdout stages
//! - [`export`] - Artifact persistence and the read side used by serving code
//! - [`diagnostics`] - Leakage audit of raw data
//!
//! ## Services
//! - [`cli`] - Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use automl_select::pipeline::{run_pipeline, RunConfig};
//!
//! let config = RunConfig::default()
//!     .with_data_path("heart.csv")
//!     .with_search_iterations(10);
//! let summary = run_pipeline(&config)?;
//! println!("{} ({:.3})", summary.selected.candidate_name, summary.holdout.test_accuracy);
//! # Ok::<(), automl_select::SelectError>(())
//! ```

// Core error handling
pub mod error;

// Core ML modules
pub mod preprocessing;
pub mod training;
pub mod calibration;
pub mod optimizer;

// Pipeline
pub mod pipeline;
pub mod export;
pub mod diagnostics;
pub mod utils;

// Services
pub mod cli;

pub use error::{Result, SelectError};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{Result, SelectError};

    // Data
    pub use crate::utils::{DataLoader, Dataset};

    // Training
    pub use crate::training::{
        Classifier, ClassifierKind, FittedPipeline, ModelSpec, PipelineSpec, StratifiedKFold,
    };

    // Optimization
    pub use crate::optimizer::{OptimizationConfig, RandomSearch, SearchSpace};

    // Pipeline
    pub use crate::pipeline::{
        default_candidates, run_pipeline, CandidateRegistry, CandidateSpec, EvaluationResult,
        RunConfig, RunSummary,
    };

    // Export
    pub use crate::export::{load_artifact, Artifact, ArtifactMetadata};

    // Diagnostics
    pub use crate::diagnostics::{diagnose, DiagnosticsReport};
}
