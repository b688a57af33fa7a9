//! Pipeline construction and fitting
//!
//! A [`PipelineSpec`] is the unfitted recipe (scaler + classifier
//! configuration); fitting it yields a [`FittedPipeline`], which is what the
//! artifact persister serializes.

use super::knn::{KNNClassifier, KNNConfig};
use super::linear_models::{LogisticConfig, LogisticRegression};
use super::models::{Classifier, ClassifierKind};
use super::random_forest::{RandomForest, RandomForestConfig};
use super::svm::{Gamma, SVMClassifier, SVMConfig};
use crate::error::{Result, SelectError};
use crate::optimizer::{ParameterValue, TrialParams};
use crate::preprocessing::{Scaler, ScalerType};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Classifier step of a pipeline, as configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModelSpec {
    LogisticRegression(LogisticConfig),
    SVMClassifier(SVMConfig),
    KNNClassifier(KNNConfig),
    RandomForest(RandomForestConfig),
}

fn float_param(name: &str, value: &ParameterValue) -> Result<f64> {
    value.as_float().ok_or_else(|| {
        SelectError::ValidationError(format!("parameter '{}' expects a number, got {}", name, value))
    })
}

fn count_param(name: &str, value: &ParameterValue) -> Result<usize> {
    value
        .as_int()
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| {
            SelectError::ValidationError(format!(
                "parameter '{}' expects a non-negative integer, got {}",
                name, value
            ))
        })
}

fn unknown_param(model: &str, name: &str) -> SelectError {
    SelectError::ValidationError(format!("{} has no hyperparameter '{}'", model, name))
}

impl ModelSpec {
    pub fn kind(&self) -> ClassifierKind {
        match self {
            ModelSpec::LogisticRegression(_) => ClassifierKind::Linear,
            ModelSpec::SVMClassifier(_) => ClassifierKind::Margin,
            ModelSpec::KNNClassifier(_) => ClassifierKind::Distance,
            ModelSpec::RandomForest(_) => ClassifierKind::EnsembleTree,
        }
    }

    /// Short model name used in messages
    pub fn model_name(&self) -> &'static str {
        match self {
            ModelSpec::LogisticRegression(_) => "LogisticRegression",
            ModelSpec::SVMClassifier(_) => "SVC",
            ModelSpec::KNNClassifier(_) => "KNeighborsClassifier",
            ModelSpec::RandomForest(_) => "RandomForestClassifier",
        }
    }

    /// Unfitted estimator for this configuration
    pub fn build(&self) -> TrainedModel {
        match self {
            ModelSpec::LogisticRegression(c) => {
                TrainedModel::LogisticRegression(LogisticRegression::new(c.clone()))
            }
            ModelSpec::SVMClassifier(c) => TrainedModel::SVMClassifier(SVMClassifier::new(c.clone())),
            ModelSpec::KNNClassifier(c) => TrainedModel::KNNClassifier(KNNClassifier::new(c.clone())),
            ModelSpec::RandomForest(c) => TrainedModel::RandomForest(RandomForest::new(c.clone())),
        }
    }

    /// Copy of this configuration with sampled hyperparameters applied
    pub fn with_params(&self, params: &TrialParams) -> Result<Self> {
        let mut spec = self.clone();
        for (name, value) in params {
            match &mut spec {
                ModelSpec::LogisticRegression(c) => match name.as_str() {
                    "C" => c.c = float_param(name, value)?,
                    "max_iter" => c.max_iter = count_param(name, value)?,
                    _ => return Err(unknown_param(self.model_name(), name)),
                },
                ModelSpec::SVMClassifier(c) => match name.as_str() {
                    "C" => c.c = float_param(name, value)?,
                    "gamma" => {
                        c.gamma = match value {
                            ParameterValue::String(s) if s == "scale" => Gamma::Scale,
                            ParameterValue::String(s) if s == "auto" => Gamma::Auto,
                            other => Gamma::Value(float_param(name, other)?),
                        }
                    }
                    _ => return Err(unknown_param(self.model_name(), name)),
                },
                ModelSpec::KNNClassifier(c) => match name.as_str() {
                    "n_neighbors" => c.n_neighbors = count_param(name, value)?,
                    _ => return Err(unknown_param(self.model_name(), name)),
                },
                ModelSpec::RandomForest(c) => match name.as_str() {
                    "n_estimators" => c.n_estimators = count_param(name, value)?,
                    "max_depth" => {
                        c.max_depth = if value.is_none() {
                            None
                        } else {
                            Some(count_param(name, value)?)
                        }
                    }
                    "min_samples_split" => c.min_samples_split = count_param(name, value)?,
                    "min_samples_leaf" => c.min_samples_leaf = count_param(name, value)?,
                    _ => return Err(unknown_param(self.model_name(), name)),
                },
            }
        }
        Ok(spec)
    }

    /// Current hyperparameters in the same vocabulary as [`ModelSpec::with_params`]
    pub fn params(&self) -> TrialParams {
        let mut params = TrialParams::new();
        match self {
            ModelSpec::LogisticRegression(c) => {
                params.insert("C".into(), ParameterValue::Float(c.c));
                params.insert("max_iter".into(), ParameterValue::Int(c.max_iter as i64));
            }
            ModelSpec::SVMClassifier(c) => {
                params.insert("C".into(), ParameterValue::Float(c.c));
                let gamma = match c.gamma {
                    Gamma::Scale => ParameterValue::String("scale".into()),
                    Gamma::Auto => ParameterValue::String("auto".into()),
                    Gamma::Value(g) => ParameterValue::Float(g),
                };
                params.insert("gamma".into(), gamma);
            }
            ModelSpec::KNNClassifier(c) => {
                params.insert("n_neighbors".into(), ParameterValue::Int(c.n_neighbors as i64));
            }
            ModelSpec::RandomForest(c) => {
                params.insert("n_estimators".into(), ParameterValue::Int(c.n_estimators as i64));
                params.insert(
                    "max_depth".into(),
                    c.max_depth.map_or(ParameterValue::None, |d| ParameterValue::Int(d as i64)),
                );
                params.insert(
                    "min_samples_split".into(),
                    ParameterValue::Int(c.min_samples_split as i64),
                );
                params.insert(
                    "min_samples_leaf".into(),
                    ParameterValue::Int(c.min_samples_leaf as i64),
                );
            }
        }
        params
    }
}

/// Enum to hold trained model variants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrainedModel {
    LogisticRegression(LogisticRegression),
    SVMClassifier(SVMClassifier),
    KNNClassifier(KNNClassifier),
    RandomForest(RandomForest),
}

impl TrainedModel {
    fn inner(&self) -> &dyn Classifier {
        match self {
            TrainedModel::LogisticRegression(m) => m,
            TrainedModel::SVMClassifier(m) => m,
            TrainedModel::KNNClassifier(m) => m,
            TrainedModel::RandomForest(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Classifier {
        match self {
            TrainedModel::LogisticRegression(m) => m,
            TrainedModel::SVMClassifier(m) => m,
            TrainedModel::KNNClassifier(m) => m,
            TrainedModel::RandomForest(m) => m,
        }
    }
}

impl Classifier for TrainedModel {
    fn kind(&self) -> ClassifierKind {
        self.inner().kind()
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.inner_mut().fit(x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.inner().predict(x)
    }

    fn supports_proba(&self) -> bool {
        self.inner().supports_proba()
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.inner().predict_proba(x)
    }
}

/// Preprocessing step followed by a classifier step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSpec {
    pub scaler: ScalerType,
    pub model: ModelSpec,
}

impl PipelineSpec {
    pub fn new(scaler: ScalerType, model: ModelSpec) -> Self {
        Self { scaler, model }
    }

    /// Standard scaling followed by `model`
    pub fn scaled(model: ModelSpec) -> Self {
        Self::new(ScalerType::Standard, model)
    }

    pub fn kind(&self) -> ClassifierKind {
        self.model.kind()
    }

    /// Fit the scaler and then the classifier on the scaled rows
    pub fn fit(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<FittedPipeline> {
        let n_pos = y.iter().filter(|&&v| v > 0.5).count();
        if n_pos == 0 || n_pos == y.len() {
            return Err(SelectError::ValidationError(
                "training labels contain a single class".to_string(),
            ));
        }

        let mut scaler = Scaler::new(self.scaler);
        let x_scaled = scaler.fit_transform(x)?;

        let mut model = self.model.build();
        model.fit(&x_scaled, y)?;

        Ok(FittedPipeline { scaler, model })
    }

    /// Hyperparameter-updated copy
    pub fn with_params(&self, params: &TrialParams) -> Result<Self> {
        Ok(Self {
            scaler: self.scaler,
            model: self.model.with_params(params)?,
        })
    }
}

/// Trained scaler + classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedPipeline {
    scaler: Scaler,
    model: TrainedModel,
}

impl FittedPipeline {
    pub fn kind(&self) -> ClassifierKind {
        self.model.kind()
    }

    pub fn model(&self) -> &TrainedModel {
        &self.model
    }

    /// Predicted 0/1 labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.model.predict(&self.scaler.transform(x)?)
    }

    /// Whether positive-class probabilities are available
    pub fn supports_proba(&self) -> bool {
        self.model.supports_proba()
    }

    /// Positive-class probabilities, `None` when the classifier has no
    /// probability output
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Option<Array1<f64>>> {
        if !self.supports_proba() {
            return Ok(None);
        }
        let x_scaled = self.scaler.transform(x)?;
        self.model.predict_proba(&x_scaled).map(Some)
    }

    /// Accuracy on `(x, y)`
    pub fn score(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
        self.model.score(&self.scaler.transform(x)?, y)
    }
}
