//! Feature scaling implementations

use crate::error::{Result, SelectError};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Type of scaler to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalerType {
    /// Standard scaling (z-score normalization): (x - mean) / std
    Standard,
    /// No scaling
    None,
}

impl std::fmt::Display for ScalerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalerType::Standard => write!(f, "standard"),
            ScalerType::None => write!(f, "passthrough"),
        }
    }
}

/// Feature scaler fitted column-wise on a training matrix
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scaler {
    scaler_type: ScalerType,
    /// Per-column center (mean for standard scaling)
    center: Option<Array1<f64>>,
    /// Per-column scale (population std for standard scaling)
    scale: Option<Array1<f64>>,
}

impl Scaler {
    /// Create a new scaler
    pub fn new(scaler_type: ScalerType) -> Self {
        Self {
            scaler_type,
            center: None,
            scale: None,
        }
    }

    pub fn scaler_type(&self) -> ScalerType {
        self.scaler_type
    }

    pub fn is_fitted(&self) -> bool {
        self.center.is_some()
    }

    /// Fit the scaler to the data
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        if x.nrows() == 0 {
            return Err(SelectError::ValidationError(
                "cannot fit scaler on an empty matrix".to_string(),
            ));
        }

        let n_features = x.ncols();
        let (center, scale) = match self.scaler_type {
            ScalerType::Standard => {
                let mean = x
                    .mean_axis(Axis(0))
                    .ok_or_else(|| SelectError::ValidationError("empty matrix".to_string()))?;
                // Population std, constant columns keep unit scale
                let std = x.std_axis(Axis(0), 0.0).mapv(|s| if s == 0.0 { 1.0 } else { s });
                (mean, std)
            }
            ScalerType::None => (Array1::zeros(n_features), Array1::ones(n_features)),
        };

        self.center = Some(center);
        self.scale = Some(scale);
        Ok(self)
    }

    /// Transform the data
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (center, scale) = match (&self.center, &self.scale) {
            (Some(c), Some(s)) => (c, s),
            _ => return Err(SelectError::ModelNotFitted),
        };

        if x.ncols() != center.len() {
            return Err(SelectError::ShapeError {
                expected: format!("{} columns", center.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        if self.scaler_type == ScalerType::None {
            return Ok(x.clone());
        }

        Ok((x - center) / scale)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_standard_scaler() {
        let x = array![[1.0, 10.0], [2.0, 10.0], [3.0, 10.0], [4.0, 10.0], [5.0, 10.0]];

        let mut scaler = Scaler::new(ScalerType::Standard);
        let result = scaler.fit_transform(&x).unwrap();

        let mean = result.column(0).mean().unwrap();
        assert!(mean.abs() < 1e-10);
        let std = result.column(0).std(0.0);
        assert!((std - 1.0).abs() < 1e-10);
        // Constant column maps to zero rather than NaN
        assert!(result.column(1).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_transform_uses_training_statistics() {
        let train = array![[0.0], [2.0]];
        let mut scaler = Scaler::new(ScalerType::Standard);
        scaler.fit(&train).unwrap();

        let out = scaler.transform(&array![[4.0]]).unwrap();
        assert!((out[[0, 0]] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_passthrough() {
        let x = array![[1.5, -2.0], [3.0, 4.0]];
        let mut scaler = Scaler::new(ScalerType::None);
        assert_eq!(scaler.fit_transform(&x).unwrap(), x);
    }

    #[test]
    fn test_unfitted_and_shape_errors() {
        let scaler = Scaler::new(ScalerType::Standard);
        assert!(matches!(scaler.transform(&array![[1.0]]), Err(SelectError::ModelNotFitted)));

        let mut scaler = Scaler::new(ScalerType::Standard);
        scaler.fit(&array![[1.0, 2.0], [3.0, 4.0]]).unwrap();
        assert!(matches!(
            scaler.transform(&array![[1.0]]),
            Err(SelectError::ShapeError { .. })
        ));
    }
}
