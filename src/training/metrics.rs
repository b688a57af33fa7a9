//! Binary classification metrics

use crate::error::{Result, SelectError};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Fraction of predictions equal to the true label
pub fn accuracy(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| (*t - *p).abs() < 0.5)
        .count();
    correct as f64 / y_true.len() as f64
}

/// 2x2 confusion matrix in label order `[0, 1]`; rows are truth, columns prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub matrix: [[usize; 2]; 2],
}

impl ConfusionMatrix {
    pub fn from_predictions(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let mut matrix = [[0usize; 2]; 2];
        for (t, p) in y_true.iter().zip(y_pred.iter()) {
            let t = usize::from(*t > 0.5);
            let p = usize::from(*p > 0.5);
            matrix[t][p] += 1;
        }
        Self { matrix }
    }

    pub fn true_negatives(&self) -> usize {
        self.matrix[0][0]
    }

    pub fn false_positives(&self) -> usize {
        self.matrix[0][1]
    }

    pub fn false_negatives(&self) -> usize {
        self.matrix[1][0]
    }

    pub fn true_positives(&self) -> usize {
        self.matrix[1][1]
    }

    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    /// Precision, recall, F1 and support for one class label
    fn class_metrics(&self, class: usize) -> ClassMetrics {
        let tp = self.matrix[class][class];
        let predicted = self.matrix[0][class] + self.matrix[1][class];
        let support = self.matrix[class][0] + self.matrix[class][1];

        let precision = ratio(tp, predicted);
        let recall = ratio(tp, support);
        let f1_score = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        ClassMetrics {
            label: class as i64,
            precision,
            recall,
            f1_score,
            support,
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Per-class row of a classification report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: i64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Averaged precision/recall/F1 over both classes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AveragedMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Precision/recall/F1 summary in the layout of a conventional classification report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: AveragedMetrics,
    pub weighted_avg: AveragedMetrics,
}

impl ClassificationReport {
    pub fn from_confusion(cm: &ConfusionMatrix) -> Self {
        let classes: Vec<ClassMetrics> = (0..2).map(|c| cm.class_metrics(c)).collect();
        let total = cm.total();
        let n_classes = classes.len() as f64;

        let macro_avg = AveragedMetrics {
            precision: classes.iter().map(|c| c.precision).sum::<f64>() / n_classes,
            recall: classes.iter().map(|c| c.recall).sum::<f64>() / n_classes,
            f1_score: classes.iter().map(|c| c.f1_score).sum::<f64>() / n_classes,
            support: total,
        };

        let weighted = |f: fn(&ClassMetrics) -> f64| {
            if total == 0 {
                return 0.0;
            }
            classes
                .iter()
                .map(|c| f(c) * c.support as f64)
                .sum::<f64>()
                / total as f64
        };
        let weighted_avg = AveragedMetrics {
            precision: weighted(|c| c.precision),
            recall: weighted(|c| c.recall),
            f1_score: weighted(|c| c.f1_score),
            support: total,
        };

        Self {
            accuracy: ratio(cm.true_negatives() + cm.true_positives(), total),
            classes,
            macro_avg,
            weighted_avg,
        }
    }

    /// Plain-text table
    pub fn to_text(&self) -> String {
        let mut out = format!(
            "{:>14} {:>10} {:>10} {:>10} {:>10}\n\n",
            "", "precision", "recall", "f1-score", "support"
        );
        for c in &self.classes {
            out.push_str(&format!(
                "{:>14} {:>10.2} {:>10.2} {:>10.2} {:>10}\n",
                c.label, c.precision, c.recall, c.f1_score, c.support
            ));
        }
        out.push('\n');
        out.push_str(&format!(
            "{:>14} {:>10} {:>10} {:>10.2} {:>10}\n",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        ));
        for (name, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            out.push_str(&format!(
                "{:>14} {:>10.2} {:>10.2} {:>10.2} {:>10}\n",
                name, avg.precision, avg.recall, avg.f1_score, avg.support
            ));
        }
        out
    }
}

/// Area under the ROC curve from positive-class scores.
///
/// Uses the Mann-Whitney rank statistic with average ranks for tied scores.
/// Fails with `MetricUnavailable` when only one class is present.
pub fn roc_auc(y_true: &Array1<f64>, scores: &Array1<f64>) -> Result<f64> {
    if y_true.len() != scores.len() {
        return Err(SelectError::ShapeError {
            expected: format!("{} scores", y_true.len()),
            actual: format!("{} scores", scores.len()),
        });
    }

    let n_pos = y_true.iter().filter(|&&y| y > 0.5).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Err(SelectError::MetricUnavailable(
            "ROC AUC needs both classes in y_true".to_string(),
        ));
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0; scores.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // 1-based ranks i+1..=j+1 share their mean
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg_rank;
        }
        i = j + 1;
    }

    let pos_rank_sum: f64 = y_true
        .iter()
        .zip(ranks.iter())
        .filter(|(y, _)| **y > 0.5)
        .map(|(_, r)| r)
        .sum();

    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    Ok((pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_accuracy() {
        let y_true = array![1.0, 0.0, 1.0, 1.0, 0.0];
        let y_pred = array![1.0, 0.0, 0.0, 1.0, 1.0];
        assert!((accuracy(&y_true, &y_pred) - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_confusion_matrix_layout() {
        let y_true = array![0.0, 0.0, 0.0, 1.0, 1.0];
        let y_pred = array![0.0, 1.0, 0.0, 1.0, 0.0];
        let cm = ConfusionMatrix::from_predictions(&y_true, &y_pred);

        assert_eq!(cm.matrix, [[2, 1], [1, 1]]);
        assert_eq!(cm.total(), 5);
    }

    #[test]
    fn test_classification_report() {
        let y_true = array![0.0, 0.0, 0.0, 1.0, 1.0];
        let y_pred = array![0.0, 1.0, 0.0, 1.0, 0.0];
        let report = ClassificationReport::from_confusion(&ConfusionMatrix::from_predictions(&y_true, &y_pred));

        let zero = &report.classes[0];
        assert!((zero.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((zero.recall - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(zero.support, 3);

        let one = &report.classes[1];
        assert!((one.precision - 0.5).abs() < 1e-12);
        assert!((one.recall - 0.5).abs() < 1e-12);

        assert!((report.accuracy - 0.6).abs() < 1e-12);
        assert!((report.macro_avg.recall - (2.0 / 3.0 + 0.5) / 2.0).abs() < 1e-12);
        let weighted = (2.0 / 3.0 * 3.0 + 0.5 * 2.0) / 5.0;
        assert!((report.weighted_avg.recall - weighted).abs() < 1e-12);
        assert!(report.to_text().contains("weighted avg"));
    }

    #[test]
    fn test_zero_division_reports_zero() {
        let y_true = array![0.0, 0.0, 1.0];
        let y_pred = array![0.0, 0.0, 0.0];
        let report = ClassificationReport::from_confusion(&ConfusionMatrix::from_predictions(&y_true, &y_pred));
        assert_eq!(report.classes[1].precision, 0.0);
        assert_eq!(report.classes[1].f1_score, 0.0);
    }

    #[test]
    fn test_roc_auc() {
        let y_true = array![0.0, 0.0, 1.0, 1.0];
        let perfect = array![0.1, 0.4, 0.35, 0.8];
        assert!((roc_auc(&y_true, &perfect).unwrap() - 0.75).abs() < 1e-12);

        let separated = array![0.1, 0.2, 0.8, 0.9];
        assert!((roc_auc(&y_true, &separated).unwrap() - 1.0).abs() < 1e-12);

        // All scores tied gives chance level
        let tied = array![0.5, 0.5, 0.5, 0.5];
        assert!((roc_auc(&y_true, &tied).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_roc_auc_single_class() {
        let y_true = array![1.0, 1.0];
        let err = roc_auc(&y_true, &array![0.3, 0.6]).unwrap_err();
        assert!(matches!(err, SelectError::MetricUnavailable(_)));
    }
}
