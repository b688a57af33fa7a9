//! Data preprocessing module
//!
//! Numeric feature scaling applied as the first stage of every candidate pipeline.

mod scaler;

pub use scaler::{Scaler, ScalerType};
