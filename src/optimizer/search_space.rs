//! Search space definition for hyperparameters

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Sampled parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterValue {
    Float(f64),
    Int(i64),
    String(String),
    /// Explicit "no value", e.g. an unbounded tree depth
    None,
}

impl ParameterValue {
    /// Get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParameterValue::Float(v) => Some(*v),
            ParameterValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Get as int
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParameterValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as string
    pub fn as_string(&self) -> Option<&str> {
        match self {
            ParameterValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ParameterValue::None)
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Float(v) => write!(f, "{}", v),
            ParameterValue::Int(v) => write!(f, "{}", v),
            ParameterValue::String(v) => write!(f, "{}", v),
            ParameterValue::None => write!(f, "None"),
        }
    }
}

/// A single hyperparameter with a finite set of candidate values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub choices: Vec<ParameterValue>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, choices: Vec<ParameterValue>) -> Self {
        Self {
            name: name.into(),
            choices,
        }
    }

    /// Draw one value uniformly
    pub fn sample(&self, rng: &mut impl Rng) -> ParameterValue {
        if self.choices.is_empty() {
            return ParameterValue::None;
        }
        let idx = rng.gen_range(0..self.choices.len());
        self.choices[idx].clone()
    }
}

/// Sampled configuration, keyed by parameter name
pub type TrialParams = BTreeMap<String, ParameterValue>;

/// Search space for hyperparameter optimization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    parameters: Vec<Parameter>,
}

impl SearchSpace {
    /// Create a new empty search space
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter to the search space
    pub fn add(mut self, param: Parameter) -> Self {
        self.parameters.push(param);
        self
    }

    /// Add a float-valued parameter
    pub fn floats(self, name: impl Into<String>, values: &[f64]) -> Self {
        let choices = values.iter().map(|&v| ParameterValue::Float(v)).collect();
        self.add(Parameter::new(name, choices))
    }

    /// Add an integer-valued parameter
    pub fn ints(self, name: impl Into<String>, values: &[i64]) -> Self {
        let choices = values.iter().map(|&v| ParameterValue::Int(v)).collect();
        self.add(Parameter::new(name, choices))
    }

    /// Add an integer parameter that may also be unset
    pub fn optional_ints(self, name: impl Into<String>, values: &[Option<i64>]) -> Self {
        let choices = values
            .iter()
            .map(|v| v.map_or(ParameterValue::None, ParameterValue::Int))
            .collect();
        self.add(Parameter::new(name, choices))
    }

    /// Add a parameter with mixed-type choices
    pub fn choices(self, name: impl Into<String>, values: Vec<ParameterValue>) -> Self {
        self.add(Parameter::new(name, values))
    }

    /// Get all parameters
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Sample one configuration, drawing parameters in declaration order
    pub fn sample(&self, rng: &mut impl Rng) -> TrialParams {
        self.parameters
            .iter()
            .map(|p| (p.name.clone(), p.sample(rng)))
            .collect()
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Number of distinct configurations
    pub fn cardinality(&self) -> usize {
        self.parameters.iter().map(|p| p.choices.len().max(1)).product()
    }
}

/// Render a configuration as `name=value` pairs
pub fn format_params(params: &TrialParams) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}
