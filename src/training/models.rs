//! Classifier capability trait

use crate::error::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Family a classifier belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassifierKind {
    /// Linear decision function (logistic regression)
    Linear,
    /// Maximum-margin kernel machine (SVM)
    Margin,
    /// Instance based (nearest neighbours)
    Distance,
    /// Ensemble of decision trees
    EnsembleTree,
}

impl std::fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ClassifierKind::Linear => "linear",
            ClassifierKind::Margin => "margin",
            ClassifierKind::Distance => "distance",
            ClassifierKind::EnsembleTree => "ensemble-tree",
        };
        write!(f, "{}", name)
    }
}

/// Uniform interface over binary classifiers.
///
/// Labels are `0.0` / `1.0`. Probability output is a capability: callers check
/// [`Classifier::supports_proba`] before asking for [`Classifier::predict_proba`].
pub trait Classifier: Send + Sync {
    /// Family of this classifier
    fn kind(&self) -> ClassifierKind;

    /// Fit the classifier to training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Predict class labels
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Whether positive-class probabilities are available
    fn supports_proba(&self) -> bool;

    /// Positive-class probabilities
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Fraction of correct predictions
    fn score(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
        let y_pred = self.predict(x)?;
        Ok(super::metrics::accuracy(y, &y_pred))
    }
}
