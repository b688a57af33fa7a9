//! Probability calibration
//!
//! Platt scaling maps raw classifier margins to probabilities.

mod platt;

pub use platt::PlattScaling;
