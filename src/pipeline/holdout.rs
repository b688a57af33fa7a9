//! Final train/test evaluation of the selected candidate

use super::config::RunConfig;
use super::evaluator::{cross_validate, EvaluationResult};
use super::registry::CandidateSpec;
use crate::error::{Result, SelectError};
use crate::training::{
    accuracy, roc_auc, stratified_train_test_split, CVSplit, ClassificationReport, ConfusionMatrix,
    FittedPipeline, StratifiedKFold,
};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Metrics of the holdout stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldoutReport {
    pub train_size: usize,
    pub test_size: usize,
    pub train_accuracy: f64,
    pub test_accuracy: f64,
    pub confusion_matrix: ConfusionMatrix,
    pub classification_report: ClassificationReport,
    /// Absent when the estimator has no probability output or the test rows hold one class
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roc_auc: Option<f64>,
    /// k-fold estimate on the train partition only; never used for selection
    pub cv_train: EvaluationResult,
}

/// Train-fitted estimator with its report and the split it was evaluated on
#[derive(Debug, Clone)]
pub struct HoldoutOutcome {
    pub fitted: FittedPipeline,
    pub split: CVSplit,
    pub report: HoldoutReport,
}

/// Positive-class scores for ROC AUC, if the capability and the data allow it
fn ranking_metric(fitted: &FittedPipeline, x_test: &Array2<f64>, y_test: &Array1<f64>) -> Result<Option<f64>> {
    let Some(proba) = fitted.predict_proba(x_test)? else {
        info!(kind = %fitted.kind(), "Estimator has no probability output; ROC AUC omitted");
        return Ok(None);
    };
    match roc_auc(y_test, &proba) {
        Ok(auc) => Ok(Some(auc)),
        Err(SelectError::MetricUnavailable(reason)) => {
            info!(%reason, "ROC AUC omitted");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Split once, fit on the train rows only and report on both partitions.
pub fn evaluate_holdout(
    candidate: &CandidateSpec,
    x: &Array2<f64>,
    y: &Array1<f64>,
    config: &RunConfig,
) -> Result<HoldoutOutcome> {
    let seeds = config.seeds();
    let split = stratified_train_test_split(y, config.test_size, seeds.holdout)?;

    let x_train = x.select(Axis(0), &split.train_indices);
    let y_train = y.select(Axis(0), &split.train_indices);
    let x_test = x.select(Axis(0), &split.test_indices);
    let y_test = y.select(Axis(0), &split.test_indices);

    let fitted = candidate
        .pipeline
        .fit(&x_train, &y_train)
        .map_err(|e| SelectError::fit_failure(&candidate.name, e))?;

    let train_accuracy = accuracy(&y_train, &fitted.predict(&x_train)?);
    let y_pred = fitted.predict(&x_test)?;
    let test_accuracy = accuracy(&y_test, &y_pred);
    let confusion_matrix = ConfusionMatrix::from_predictions(&y_test, &y_pred);
    let classification_report = ClassificationReport::from_confusion(&confusion_matrix);
    let roc_auc = ranking_metric(&fitted, &x_test, &y_test)?;

    let train_splits = StratifiedKFold::new(config.cv_folds)
        .with_random_state(seeds.cv)
        .split(&y_train)?;
    let cv_scores = cross_validate(&candidate.pipeline, &x_train, &y_train, &train_splits)
        .map_err(|e| SelectError::fit_failure(&candidate.name, e))?;
    let cv_train = EvaluationResult::from_scores(&candidate.name, cv_scores);

    info!(
        candidate = %candidate.name,
        train_accuracy,
        test_accuracy,
        cv_train_mean = cv_train.mean,
        "Holdout evaluation"
    );

    Ok(HoldoutOutcome {
        fitted,
        report: HoldoutReport {
            train_size: split.train_indices.len(),
            test_size: split.test_indices.len(),
            train_accuracy,
            test_accuracy,
            confusion_matrix,
            classification_report,
            roc_auc,
            cv_train,
        },
        split,
    })
}
