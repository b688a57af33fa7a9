//! Error types for the selection pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, SelectError>;

/// Main error type for the selection pipeline
#[derive(Error, Debug)]
pub enum SelectError {
    #[error("Dataset not found: {0}")]
    DataNotFound(String),

    #[error("Schema error: {0}")]
    SchemaError(String),

    #[error("Fit failed for candidate '{candidate}': {reason}")]
    FitFailure { candidate: String, reason: String },

    #[error("Metric unavailable: {0}")]
    MetricUnavailable(String),

    #[error("Persistence failed during {stage}: {reason}")]
    PersistenceFailure { stage: String, reason: String },

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Missing features: {0:?}")]
    MissingFeatures(Vec<String>),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SelectError {
    /// Wrap any error raised while fitting or scoring a candidate.
    pub fn fit_failure(candidate: impl Into<String>, err: impl std::fmt::Display) -> Self {
        SelectError::FitFailure {
            candidate: candidate.into(),
            reason: err.to_string(),
        }
    }

    /// Wrap any error raised while writing artifacts.
    pub fn persistence(stage: impl Into<String>, err: impl std::fmt::Display) -> Self {
        SelectError::PersistenceFailure {
            stage: stage.into(),
            reason: err.to_string(),
        }
    }
}

impl From<polars::error::PolarsError> for SelectError {
    fn from(err: polars::error::PolarsError) -> Self {
        SelectError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for SelectError {
    fn from(err: serde_json::Error) -> Self {
        SelectError::SerializationError(err.to_string())
    }
}

impl From<bincode::Error> for SelectError {
    fn from(err: bincode::Error) -> Self {
        SelectError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for SelectError {
    fn from(err: ndarray::ShapeError) -> Self {
        SelectError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
