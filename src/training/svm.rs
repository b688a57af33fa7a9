//! Support Vector Machine classifier
//!
//! Binary RBF-kernel SVM trained with SMO (Sequential Minimal Optimization).
//! Optional probability output comes from a Platt sigmoid fitted on the
//! training decision values.

use super::models::{Classifier, ClassifierKind};
use crate::calibration::PlattScaling;
use crate::error::{Result, SelectError};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Maximum number of samples for eager kernel matrix computation.
/// Beyond this, training will return an error to prevent OOM.
const MAX_KERNEL_MATRIX_SAMPLES: usize = 10_000;

/// RBF kernel width
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Gamma {
    /// 1 / (n_features * Var(X)), variance over every element of the training matrix
    Scale,
    /// 1 / n_features
    Auto,
    /// Fixed value
    Value(f64),
}

impl Gamma {
    /// Resolve to a numeric width for training matrix `x`
    pub fn resolve(&self, x: &Array2<f64>) -> f64 {
        let n_features = x.ncols().max(1) as f64;
        match self {
            Gamma::Scale => {
                let var = x.var(0.0);
                if var > 0.0 {
                    1.0 / (n_features * var)
                } else {
                    1.0
                }
            }
            Gamma::Auto => 1.0 / n_features,
            Gamma::Value(g) => *g,
        }
    }
}

impl std::fmt::Display for Gamma {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Gamma::Scale => write!(f, "scale"),
            Gamma::Auto => write!(f, "auto"),
            Gamma::Value(g) => write!(f, "{}", g),
        }
    }
}

/// SVM configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SVMConfig {
    /// Regularization parameter (C)
    pub c: f64,
    /// RBF kernel width
    pub gamma: Gamma,
    /// Tolerance for stopping criterion
    pub tol: f64,
    /// Maximum number of passes over the data
    pub max_iter: usize,
    /// Fit a Platt sigmoid so probabilities are available
    pub probability: bool,
    /// Seed for the second-multiplier choice
    pub random_state: u64,
}

impl Default for SVMConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            gamma: Gamma::Scale,
            tol: 1e-3,
            max_iter: 1000,
            probability: true,
            random_state: 42,
        }
    }
}

/// Support Vector Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SVMClassifier {
    config: SVMConfig,
    /// Support vectors
    support_vectors: Option<Array2<f64>>,
    /// alpha_i * y_i for each support vector
    dual_coef: Option<Array1<f64>>,
    /// Bias term
    bias: f64,
    /// Resolved kernel width
    gamma: f64,
    /// Sigmoid calibrator when probabilities are enabled
    platt: Option<PlattScaling>,
}

impl SVMClassifier {
    /// Create a new SVM classifier
    pub fn new(config: SVMConfig) -> Self {
        Self {
            config,
            support_vectors: None,
            dual_coef: None,
            bias: 0.0,
            gamma: 0.0,
            platt: None,
        }
    }

    pub fn config(&self) -> &SVMConfig {
        &self.config
    }

    fn rbf(gamma: f64, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        let norm_sq: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum();
        (-gamma * norm_sq).exp()
    }

    /// Compute kernel matrix (rows in parallel)
    fn compute_kernel_matrix(gamma: f64, x: &Array2<f64>) -> Array2<f64> {
        let n = x.nrows();
        let rows: Vec<Vec<f64>> = (0..n)
            .into_par_iter()
            .map(|i| (0..n).map(|j| Self::rbf(gamma, x.row(i), x.row(j))).collect())
            .collect();

        let mut k = Array2::zeros((n, n));
        for (i, row) in rows.into_iter().enumerate() {
            for (j, val) in row.into_iter().enumerate() {
                k[[i, j]] = val;
            }
        }
        k
    }

    /// SMO training with an error cache. `y` holds -1/+1 labels.
    fn smo_train(&self, k: &Array2<f64>, y: &Array1<f64>) -> (Array1<f64>, f64) {
        let n = y.len();
        let c = self.config.c;
        let tol = self.config.tol;

        let mut alphas: Array1<f64> = Array1::zeros(n);
        let mut bias = 0.0;
        // f(x_i) - y_i with all alphas zero
        let mut errors: Array1<f64> = -y;

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);

        let mut passes = 0;
        let max_passes = 5;
        let mut total_iter = 0;

        while passes < max_passes && total_iter < self.config.max_iter {
            let mut num_changed = 0;

            for i in 0..n {
                let e_i = errors[i];

                // KKT violation check
                if !((y[i] * e_i < -tol && alphas[i] < c) || (y[i] * e_i > tol && alphas[i] > 0.0)) {
                    continue;
                }

                let j = loop {
                    let j = rng.gen_range(0..n);
                    if j != i {
                        break j;
                    }
                };
                let e_j = errors[j];

                let alpha_i_old = alphas[i];
                let alpha_j_old = alphas[j];

                let (l, h) = if y[i] != y[j] {
                    ((alpha_j_old - alpha_i_old).max(0.0), (c + alpha_j_old - alpha_i_old).min(c))
                } else {
                    ((alpha_i_old + alpha_j_old - c).max(0.0), (alpha_i_old + alpha_j_old).min(c))
                };
                if (l - h).abs() < 1e-10 {
                    continue;
                }

                let eta = 2.0 * k[[i, j]] - k[[i, i]] - k[[j, j]];
                if eta >= 0.0 {
                    continue;
                }

                let alpha_j = (alpha_j_old - y[j] * (e_i - e_j) / eta).clamp(l, h);
                if (alpha_j - alpha_j_old).abs() < 1e-5 {
                    continue;
                }
                let alpha_i = alpha_i_old + y[i] * y[j] * (alpha_j_old - alpha_j);

                let d_i = y[i] * (alpha_i - alpha_i_old);
                let d_j = y[j] * (alpha_j - alpha_j_old);

                let b1 = bias - e_i - d_i * k[[i, i]] - d_j * k[[i, j]];
                let b2 = bias - e_j - d_i * k[[i, j]] - d_j * k[[j, j]];
                let new_bias = if alpha_i > 0.0 && alpha_i < c {
                    b1
                } else if alpha_j > 0.0 && alpha_j < c {
                    b2
                } else {
                    (b1 + b2) / 2.0
                };

                let d_b = new_bias - bias;
                for m in 0..n {
                    errors[m] += d_i * k[[i, m]] + d_j * k[[j, m]] + d_b;
                }

                alphas[i] = alpha_i;
                alphas[j] = alpha_j;
                bias = new_bias;
                num_changed += 1;
            }

            total_iter += 1;
            if num_changed == 0 {
                passes += 1;
            } else {
                passes = 0;
            }
        }

        (alphas, bias)
    }

    /// Signed distance-like score; positive means class 1
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (sv, coef) = match (&self.support_vectors, &self.dual_coef) {
            (Some(sv), Some(coef)) => (sv, coef),
            _ => return Err(SelectError::ModelNotFitted),
        };
        if x.ncols() != sv.ncols() {
            return Err(SelectError::ShapeError {
                expected: format!("{} features", sv.ncols()),
                actual: format!("{} features", x.ncols()),
            });
        }

        let scores: Vec<f64> = x
            .outer_iter()
            .map(|row| {
                sv.outer_iter()
                    .zip(coef.iter())
                    .map(|(s, a)| a * Self::rbf(self.gamma, s, row))
                    .sum::<f64>()
                    + self.bias
            })
            .collect();

        Ok(Array1::from_vec(scores))
    }

    /// Get number of support vectors
    pub fn n_support_vectors(&self) -> usize {
        self.support_vectors.as_ref().map(|sv| sv.nrows()).unwrap_or(0)
    }
}

impl Classifier for SVMClassifier {
    fn kind(&self) -> ClassifierKind {
        ClassifierKind::Margin
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n = x.nrows();
        if n != y.len() {
            return Err(SelectError::ShapeError {
                expected: format!("y length = {}", n),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n > MAX_KERNEL_MATRIX_SAMPLES {
            return Err(SelectError::ValidationError(format!(
                "{} samples exceeds the SVM kernel matrix limit of {}",
                n, MAX_KERNEL_MATRIX_SAMPLES
            )));
        }
        if self.config.c <= 0.0 {
            return Err(SelectError::ValidationError(format!(
                "C must be positive, got {}",
                self.config.c
            )));
        }

        let n_pos = y.iter().filter(|&&v| v > 0.5).count();
        if n_pos == 0 || n_pos == n {
            return Err(SelectError::ValidationError(
                "SVM requires both classes in the training data".to_string(),
            ));
        }

        let y_signed = y.mapv(|v| if v > 0.5 { 1.0 } else { -1.0 });
        self.gamma = self.config.gamma.resolve(x);

        let kernel_matrix = Self::compute_kernel_matrix(self.gamma, x);
        let (alphas, bias) = self.smo_train(&kernel_matrix, &y_signed);

        let support: Vec<usize> = (0..n).filter(|&i| alphas[i] > 1e-8).collect();
        let mut support_vectors = Array2::zeros((support.len(), x.ncols()));
        let mut dual_coef = Array1::zeros(support.len());
        for (row, &idx) in support.iter().enumerate() {
            support_vectors.row_mut(row).assign(&x.row(idx));
            dual_coef[row] = alphas[idx] * y_signed[idx];
        }

        self.support_vectors = Some(support_vectors);
        self.dual_coef = Some(dual_coef);
        self.bias = bias;

        self.platt = if self.config.probability {
            let scores = self.decision_function(x)?;
            let mut platt = PlattScaling::new();
            platt.fit(&scores, y)?;
            Some(platt)
        } else {
            None
        };

        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let scores = self.decision_function(x)?;
        Ok(scores.mapv(|s| if s > 0.0 { 1.0 } else { 0.0 }))
    }

    fn supports_proba(&self) -> bool {
        self.config.probability
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.config.probability {
            return Err(SelectError::MetricUnavailable(
                "SVM was configured without probability output".to_string(),
            ));
        }
        let platt = self.platt.as_ref().ok_or(SelectError::ModelNotFitted)?;
        platt.calibrate(&self.decision_function(x)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_separable_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_vec((10, 2), vec![
            1.0, 1.0,
            1.5, 1.2,
            2.0, 2.0,
            1.2, 1.8,
            0.8, 1.5,
            5.0, 5.0,
            5.5, 5.2,
            6.0, 6.0,
            5.2, 5.8,
            4.8, 5.5,
        ]).unwrap();

        let y = Array1::from_vec(vec![0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0]);

        (x, y)
    }

    #[test]
    fn test_svm_classifier_rbf() {
        let (x, y) = create_separable_data();

        let mut svm = SVMClassifier::new(SVMConfig {
            gamma: Gamma::Value(0.5),
            ..Default::default()
        });
        svm.fit(&x, &y).unwrap();

        let accuracy = svm.score(&x, &y).unwrap();
        assert!(accuracy > 0.8, "Accuracy {} should be > 0.8", accuracy);
        assert!(svm.n_support_vectors() > 0);
    }

    #[test]
    fn test_probability_capability() {
        let (x, y) = create_separable_data();

        let mut svm = SVMClassifier::new(SVMConfig::default());
        svm.fit(&x, &y).unwrap();
        assert!(svm.supports_proba());
        let proba = svm.predict_proba(&x).unwrap();
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
        assert!(proba[7] > proba[0]);

        let mut plain = SVMClassifier::new(SVMConfig {
            probability: false,
            ..Default::default()
        });
        plain.fit(&x, &y).unwrap();
        assert!(!plain.supports_proba());
        assert!(plain.predict_proba(&x).is_err());
    }

    #[test]
    fn test_gamma_resolution() {
        let x = Array2::from_shape_vec((2, 2), vec![0.0, 0.0, 2.0, 2.0]).unwrap();
        // Element variance is 1.0
        assert!((Gamma::Scale.resolve(&x) - 0.5).abs() < 1e-12);
        assert!((Gamma::Auto.resolve(&x) - 0.5).abs() < 1e-12);
        assert_eq!(Gamma::Value(0.1).resolve(&x), 0.1);
    }

    #[test]
    fn test_deterministic_fit() {
        let (x, y) = create_separable_data();
        let mut a = SVMClassifier::new(SVMConfig::default());
        let mut b = SVMClassifier::new(SVMConfig::default());
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.decision_function(&x).unwrap(), b.decision_function(&x).unwrap());
    }

    #[test]
    fn test_single_class_rejected() {
        let (x, _) = create_separable_data();
        let y = Array1::zeros(10);
        let mut svm = SVMClassifier::new(SVMConfig::default());
        assert!(svm.fit(&x, &y).is_err());
    }
}
