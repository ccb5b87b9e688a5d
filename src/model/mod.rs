//! Crop classifier: artifact loading, forest evaluation and top-K ranking.

pub mod artifact;
pub mod forest;
pub mod predictor;

pub use artifact::{ModelArtifact, StandardScaler, TreeArtifact};
pub use forest::{DecisionTree, Node, RandomForest};
pub use predictor::{format_percent, CropModel, Prediction, PredictionResult};
