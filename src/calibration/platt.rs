//! Platt scaling (sigmoid calibration)

use crate::error::{Result, SelectError};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Platt scaling calibrator
///
/// Fits a sigmoid on raw decision values: P(y=1|f) = 1 / (1 + exp(A*f + B))
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlattScaling {
    /// Slope parameter A
    a: Option<f64>,
    /// Intercept parameter B
    b: Option<f64>,
    /// Maximum Newton iterations
    max_iter: usize,
    /// Convergence tolerance
    tol: f64,
}

impl PlattScaling {
    /// Create new Platt scaling calibrator
    pub fn new() -> Self {
        Self {
            a: None,
            b: None,
            max_iter: 100,
            tol: 1e-7,
        }
    }

    /// Set maximum iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Get fitted parameters
    pub fn parameters(&self) -> Option<(f64, f64)> {
        match (self.a, self.b) {
            (Some(a), Some(b)) => Some((a, b)),
            _ => None,
        }
    }

    fn sigmoid(a: f64, b: f64, f: f64) -> f64 {
        let z = a * f + b;
        // Evaluated on the stable side of the exponential
        if z >= 0.0 {
            (-z).exp() / (1.0 + (-z).exp())
        } else {
            1.0 / (1.0 + z.exp())
        }
    }

    /// Fit A and B on decision values and 0/1 labels with Newton's method
    pub fn fit(&mut self, scores: &Array1<f64>, labels: &Array1<f64>) -> Result<()> {
        let n = scores.len();
        if n != labels.len() {
            return Err(SelectError::ValidationError(
                "Scores and labels must have same length".to_string(),
            ));
        }
        if n == 0 {
            return Err(SelectError::ValidationError("Empty input".to_string()));
        }

        // Platt's prior-corrected targets
        let n_pos = labels.iter().filter(|&&y| y > 0.5).count() as f64;
        let n_neg = n as f64 - n_pos;
        let target_pos = (n_pos + 1.0) / (n_pos + 2.0);
        let target_neg = 1.0 / (n_neg + 2.0);

        let targets: Vec<f64> = labels
            .iter()
            .map(|&y| if y > 0.5 { target_pos } else { target_neg })
            .collect();

        let mut a = 0.0;
        let mut b = ((n_neg + 1.0) / (n_pos + 1.0)).ln();

        for _ in 0..self.max_iter {
            let mut grad_a = 0.0;
            let mut grad_b = 0.0;
            let mut hess_aa = 1e-12;
            let mut hess_ab = 0.0;
            let mut hess_bb = 1e-12;

            for i in 0..n {
                let f = scores[i];
                let p = Self::sigmoid(a, b, f);
                let t = targets[i];

                // d/dz of the negative log likelihood with P = 1/(1+exp(z))
                let d1 = t - p;
                let d2 = p * (1.0 - p);

                grad_a += f * d1;
                grad_b += d1;

                hess_aa += f * f * d2;
                hess_ab += f * d2;
                hess_bb += d2;
            }

            let det = hess_aa * hess_bb - hess_ab * hess_ab;
            if det.abs() < 1e-18 {
                break;
            }

            let delta_a = (hess_bb * grad_a - hess_ab * grad_b) / det;
            let delta_b = (hess_aa * grad_b - hess_ab * grad_a) / det;

            a -= delta_a;
            b -= delta_b;

            if delta_a.abs() < self.tol && delta_b.abs() < self.tol {
                break;
            }
        }

        if !a.is_finite() || !b.is_finite() {
            return Err(SelectError::ValidationError(
                "Platt scaling did not converge".to_string(),
            ));
        }

        self.a = Some(a);
        self.b = Some(b);
        Ok(())
    }

    /// Map decision values to positive-class probabilities
    pub fn calibrate(&self, scores: &Array1<f64>) -> Result<Array1<f64>> {
        let (a, b) = self.parameters().ok_or_else(|| {
            SelectError::ValidationError("Calibrator not fitted".to_string())
        })?;
        Ok(scores.mapv(|f| Self::sigmoid(a, b, f)))
    }
}

impl Default for PlattScaling {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_platt_scaling_orders_scores() {
        let scores = array![-2.0, -1.2, -0.4, 0.3, 0.1, 1.1, 1.9, -0.2];
        let labels = array![0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 1.0];

        let mut calibrator = PlattScaling::new();
        calibrator.fit(&scores, &labels).unwrap();

        let calibrated = calibrator.calibrate(&scores).unwrap();
        assert_eq!(calibrated.len(), scores.len());
        assert!(calibrated.iter().all(|&p| (0.0..=1.0).contains(&p)));
        // Larger margin means higher positive probability
        assert!(calibrated[6] > calibrated[0]);

        let (a, _) = calibrator.parameters().unwrap();
        assert!(a < 0.0);
    }

    #[test]
    fn test_unfitted_calibrator() {
        let calibrator = PlattScaling::new();
        assert!(calibrator.calibrate(&array![0.5]).is_err());
    }
}
