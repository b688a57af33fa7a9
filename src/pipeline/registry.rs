//! Candidate registry

use crate::error::{Result, SelectError};
use crate::optimizer::{ParameterValue, SearchSpace, TrialParams};
use crate::training::{
    ClassifierKind, KNNConfig, LogisticConfig, ModelSpec, PipelineSpec, RandomForestConfig, SVMConfig,
};
use serde::{Deserialize, Serialize};

/// Suffix of candidates registered by the search stage
pub const TUNED_SUFFIX: &str = " (tuned)";

/// A named pipeline eligible for selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSpec {
    pub name: String,
    pub pipeline: PipelineSpec,
    /// Values the search stage may sample; `None` opts out of tuning
    pub search_space: Option<SearchSpace>,
    /// Base candidate this one was tuned from
    pub tuned_from: Option<String>,
}

impl CandidateSpec {
    pub fn new(name: impl Into<String>, pipeline: PipelineSpec) -> Self {
        Self {
            name: name.into(),
            pipeline,
            search_space: None,
            tuned_from: None,
        }
    }

    pub fn with_search_space(mut self, space: SearchSpace) -> Self {
        self.search_space = Some(space);
        self
    }

    pub fn kind(&self) -> ClassifierKind {
        self.pipeline.kind()
    }

    pub fn is_searchable(&self) -> bool {
        self.tuned_from.is_none() && self.search_space.as_ref().map_or(false, |s| !s.is_empty())
    }

    /// `"<name> (tuned)"` candidate carrying the given hyperparameters
    pub fn tuned(&self, params: &TrialParams) -> Result<Self> {
        Ok(Self {
            name: format!("{}{}", self.name, TUNED_SUFFIX),
            pipeline: self.pipeline.with_params(params)?,
            search_space: None,
            tuned_from: Some(self.name.clone()),
        })
    }
}

/// Insertion-ordered candidates; the index is the selection tie-break key
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateRegistry {
    candidates: Vec<CandidateSpec>,
}

impl CandidateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a candidate, returning its index. Names are unique.
    pub fn register(&mut self, candidate: CandidateSpec) -> Result<usize> {
        if self.index_of(&candidate.name).is_some() {
            return Err(SelectError::ConfigError(format!(
                "candidate '{}' is already registered",
                candidate.name
            )));
        }
        self.candidates.push(candidate);
        Ok(self.candidates.len() - 1)
    }

    pub fn get(&self, name: &str) -> Option<&CandidateSpec> {
        self.candidates.iter().find(|c| c.name == name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.candidates.iter().position(|c| c.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CandidateSpec> {
        self.candidates.iter()
    }

    pub fn candidates(&self) -> &[CandidateSpec] {
        &self.candidates
    }

    pub fn names(&self) -> Vec<String> {
        self.candidates.iter().map(|c| c.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Search space of the margin-based candidate
pub fn svm_search_space() -> SearchSpace {
    SearchSpace::new()
        .floats("C", &[0.01, 0.1, 1.0, 10.0, 100.0])
        .choices(
            "gamma",
            vec![
                ParameterValue::String("scale".into()),
                ParameterValue::String("auto".into()),
                ParameterValue::Float(0.01),
                ParameterValue::Float(0.1),
                ParameterValue::Float(1.0),
            ],
        )
}

/// Search space of the tree-ensemble candidate
pub fn forest_search_space() -> SearchSpace {
    SearchSpace::new()
        .ints("n_estimators", &[100, 200, 300])
        .optional_ints("max_depth", &[None, Some(5), Some(10), Some(20)])
        .ints("min_samples_split", &[2, 5, 10])
        .ints("min_samples_leaf", &[1, 2, 4])
}

/// The four standard-scaled candidates, in tie-break order
pub fn default_candidates(random_seed: u64) -> CandidateRegistry {
    let candidates = vec![
        CandidateSpec::new(
            "Logistic Regression",
            PipelineSpec::scaled(ModelSpec::LogisticRegression(LogisticConfig::default())),
        ),
        CandidateSpec::new(
            "SVM",
            PipelineSpec::scaled(ModelSpec::SVMClassifier(SVMConfig {
                random_state: random_seed,
                ..Default::default()
            })),
        )
        .with_search_space(svm_search_space()),
        CandidateSpec::new(
            "KNN",
            PipelineSpec::scaled(ModelSpec::KNNClassifier(KNNConfig { n_neighbors: 5 })),
        ),
        CandidateSpec::new(
            "Random Forest",
            PipelineSpec::scaled(ModelSpec::RandomForest(RandomForestConfig {
                n_estimators: 200,
                random_state: random_seed,
                ..Default::default()
            })),
        )
        .with_search_space(forest_search_space()),
    ];

    CandidateRegistry { candidates }
}
