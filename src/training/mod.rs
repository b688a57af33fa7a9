//! Model training module
//!
//! Binary classifiers behind the [`Classifier`] capability trait:
//! - Logistic regression (linear)
//! - RBF support vector machine (margin-based)
//! - K-Nearest Neighbors (distance-based)
//! - Random Forest (tree ensemble)
//!
//! plus stratified resampling and the evaluation metrics used by the
//! selection pipeline.

mod engine;
mod models;
pub mod cross_validation;
pub mod decision_tree;
pub mod knn;
pub mod linear_models;
pub mod metrics;
pub mod random_forest;
pub mod svm;

pub use cross_validation::{stratified_train_test_split, CVSplit, StratifiedKFold};
pub use decision_tree::{DecisionTree, TreeNode};
pub use engine::{FittedPipeline, ModelSpec, PipelineSpec, TrainedModel};
pub use knn::{KNNClassifier, KNNConfig};
pub use linear_models::{LogisticConfig, LogisticRegression};
pub use metrics::{accuracy, roc_auc, ClassMetrics, ClassificationReport, ConfusionMatrix};
pub use models::{Classifier, ClassifierKind};
pub use random_forest::{RandomForest, RandomForestConfig};
pub use svm::{Gamma, SVMClassifier, SVMConfig};
