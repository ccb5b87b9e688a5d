//! Model Artifact
//!
//! JSON export of the trained random forest. Trees use the sklearn `tree_`
//! parallel-array layout so the training script can dump them directly.
//! For a fitted `RandomForestClassifier` `rf` (and optional `StandardScaler`
//! `sc` applied before fitting):
//!
//! - `feature_names`: the training column names, any order of the seven features
//! - `classes`: `rf.classes_` as strings
//! - `scaler`: `{"mean": sc.mean_, "scale": sc.scale_}` or `null`
//! - `feature_importances`: `rf.feature_importances_`
//! - per estimator `t = est.tree_`: `children_left`, `children_right`,
//!   `feature`, `threshold`, `value` (`t.value[:, 0, :]`) and `cover`
//!   (`t.n_node_samples`)
//!
//! The server reads the file from `MODEL_PATH` (default
//! `models/crop_model.json`) and refuses to start without it.
//!
//!
//! ```json
//! {
//!   "feature_names": ["N", "P", "K", "pH", "temperature", "humidity", "rainfall"],
//!   "classes": ["apple", "banana", ...],
//!   "scaler": null,
//!   "feature_importances": [0.1, ...],
//!   "trees": [{
//!     "children_left": [1, -1, -1], "children_right": [2, -1, -1],
//!     "feature": [6, -2, -2], "threshold": [150.0, -2.0, -2.0],
//!     "value": [[...], [...], [...]], "cover": [100, 60, 40]
//!   }]
//! }
//! ```

use anyhow::{bail, ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::forest::{DecisionTree, Node, RandomForest, LEAF};
use crate::features::{Feature, FEATURE_COUNT};

/// Serialized classifier plus fitted preprocessing state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Column order the model was trained on
    pub feature_names: Vec<String>,
    /// Label encoding (class index → crop name)
    pub classes: Vec<String>,
    #[serde(default)]
    pub scaler: Option<StandardScaler>,
    /// Impurity-based importances, one per column
    #[serde(default)]
    pub feature_importances: Option<Vec<f64>>,
    pub trees: Vec<TreeArtifact>,
}

/// Fitted standardisation `(x - mean) / scale`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn transform(&self, row: &mut [f64]) {
        for ((x, mean), scale) in row.iter_mut().zip(&self.mean).zip(&self.scale) {
            // sklearn leaves zero-variance columns unscaled
            let s = if *scale == 0.0 { 1.0 } else { *scale };
            *x = (*x - mean) / s;
        }
    }
}

/// One exported decision tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeArtifact {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    /// Per-node class counts or fractions; normalised on load
    pub value: Vec<Vec<f64>>,
    /// Per-node training sample count (`n_node_samples`)
    pub cover: Vec<f64>,
}

impl ModelArtifact {
    /// Load artifact from JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read model artifact: {:?}", path))?;

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse model artifact JSON: {:?}", path))
    }

    /// Map each artifact column to its feature
    pub fn columns(&self) -> Result<Vec<Feature>> {
        ensure!(
            self.feature_names.len() == FEATURE_COUNT,
            "Expected {} feature columns, artifact has {}",
            FEATURE_COUNT,
            self.feature_names.len()
        );

        let mut columns = Vec::with_capacity(FEATURE_COUNT);
        for name in &self.feature_names {
            let feature = Feature::from_name(name)
                .with_context(|| format!("Unknown feature column '{}'", name))?;
            ensure!(!columns.contains(&feature), "Duplicate feature column '{}'", name);
            columns.push(feature);
        }
        Ok(columns)
    }

    /// Validate shapes and build the in-memory forest
    pub fn build_forest(&self) -> Result<RandomForest> {
        let n_classes = self.classes.len();
        let n_features = self.feature_names.len();
        ensure!(n_classes > 0, "Artifact has no classes");
        ensure!(!self.trees.is_empty(), "Artifact has no trees");

        if let Some(scaler) = &self.scaler {
            ensure!(
                scaler.mean.len() == n_features && scaler.scale.len() == n_features,
                "Scaler length does not match {} feature columns",
                n_features
            );
        }
        if let Some(importances) = &self.feature_importances {
            ensure!(
                importances.len() == n_features,
                "feature_importances length {} does not match {} columns",
                importances.len(),
                n_features
            );
        }

        let trees = self
            .trees
            .iter()
            .enumerate()
            .map(|(i, t)| {
                t.build(n_classes, n_features)
                    .with_context(|| format!("Invalid tree #{}", i))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(RandomForest::new(trees, n_classes, n_features))
    }
}

impl TreeArtifact {
    fn build(&self, n_classes: usize, n_features: usize) -> Result<DecisionTree> {
        let n = self.children_left.len();
        ensure!(n > 0, "Tree has no nodes");
        ensure!(
            self.children_right.len() == n
                && self.feature.len() == n
                && self.threshold.len() == n
                && self.value.len() == n
                && self.cover.len() == n,
            "Node arrays have inconsistent lengths"
        );
        // Expected values divide by the root cover
        ensure!(self.cover[0] > 0.0, "Root node has zero cover");

        let mut nodes = Vec::with_capacity(n);
        let mut values = Vec::with_capacity(n * n_classes);

        for i in 0..n {
            let (left, right) = (self.children_left[i], self.children_right[i]);
            let cover = self.cover[i];
            ensure!(cover.is_finite() && cover >= 0.0, "Node {} has invalid cover {}", i, cover);

            let node = if left < 0 && right < 0 {
                Node { left: LEAF, right: LEAF, feature: 0, threshold: 0.0, cover }
            } else {
                // Children must point forward; this also rules out cycles
                let child = |c: i64| -> Result<usize> {
                    if c <= i as i64 || c >= n as i64 {
                        bail!("Node {} has out-of-order child {}", i, c);
                    }
                    Ok(c as usize)
                };
                let feature = self.feature[i];
                ensure!(
                    feature >= 0 && (feature as usize) < n_features,
                    "Node {} splits on invalid feature {}",
                    i,
                    feature
                );
                ensure!(cover > 0.0, "Internal node {} has zero cover", i);
                Node {
                    left: child(left)?,
                    right: child(right)?,
                    feature: feature as usize,
                    threshold: self.threshold[i],
                    cover,
                }
            };
            nodes.push(node);

            let row = &self.value[i];
            ensure!(
                row.len() == n_classes,
                "Node {} has {} class values, expected {}",
                i,
                row.len(),
                n_classes
            );
            ensure!(
                row.iter().all(|v| v.is_finite() && *v >= 0.0),
                "Node {} has negative or non-finite class values",
                i
            );
            let total: f64 = row.iter().sum();
            ensure!(total > 0.0, "Node {} has an empty class distribution", i);
            values.extend(row.iter().map(|v| v / total));
        }

        Ok(DecisionTree::new(nodes, values, n_classes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn stump_json() -> serde_json::Value {
        serde_json::json!({
            "feature_names": ["N", "P", "K", "pH", "temperature", "humidity", "rainfall"],
            "classes": ["maize", "rice"],
            "trees": [{
                "children_left": [1, -1, -1],
                "children_right": [2, -1, -1],
                "feature": [6, -2, -2],
                "threshold": [150.0, -2.0, -2.0],
                "value": [[5.0, 5.0], [4.0, 1.0], [1.0, 4.0]],
                "cover": [10.0, 5.0, 5.0]
            }]
        })
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", stump_json()).unwrap();

        let artifact = ModelArtifact::load(file.path()).unwrap();
        let forest = artifact.build_forest().unwrap();
        assert_eq!(forest.n_classes(), 2);
        // Counts are normalised to fractions
        assert_eq!(forest.trees()[0].distribution(1), &[0.8, 0.2]);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = ModelArtifact::load(Path::new("/nonexistent/crop_model.json")).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read model artifact"));
    }

    #[test]
    fn test_corrupt_json_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"classes\": [").unwrap();
        assert!(ModelArtifact::load(file.path()).is_err());
    }

    #[test]
    fn test_backward_child_rejected() {
        let mut json = stump_json();
        json["trees"][0]["children_left"] = serde_json::json!([0, -1, -1]);
        let artifact: ModelArtifact = serde_json::from_value(json).unwrap();
        let err = artifact.build_forest().unwrap_err();
        assert!(format!("{:#}", err).contains("out-of-order child"));
    }

    #[test]
    fn test_zero_root_cover_rejected() {
        let mut json = stump_json();
        json["trees"][0] = serde_json::json!({
            "children_left": [-1],
            "children_right": [-1],
            "feature": [-2],
            "threshold": [-2.0],
            "value": [[1.0, 1.0]],
            "cover": [0.0]
        });
        let artifact: ModelArtifact = serde_json::from_value(json).unwrap();
        let err = artifact.build_forest().unwrap_err();
        assert!(format!("{:#}", err).contains("Root node has zero cover"));
    }

    #[test]
    fn test_wrong_class_width_rejected() {
        let mut json = stump_json();
        json["trees"][0]["value"][2] = serde_json::json!([1.0]);
        let artifact: ModelArtifact = serde_json::from_value(json).unwrap();
        assert!(artifact.build_forest().is_err());
    }

    #[test]
    fn test_columns_must_be_the_seven_features() {
        let mut json = stump_json();
        json["feature_names"] = serde_json::json!(["N", "P", "K", "pH", "temperature", "humidity", "soil_moisture"]);
        let artifact: ModelArtifact = serde_json::from_value(json).unwrap();
        assert!(artifact.columns().is_err());

        let mut json = stump_json();
        json["feature_names"] = serde_json::json!(["rainfall", "P", "K", "pH", "temperature", "humidity", "N"]);
        let artifact: ModelArtifact = serde_json::from_value(json).unwrap();
        let columns = artifact.columns().unwrap();
        assert_eq!(columns[0], Feature::Rainfall);
        assert_eq!(columns[6], Feature::Nitrogen);
    }

    #[test]
    fn test_scaler_transform() {
        let scaler = StandardScaler { mean: vec![10.0, 0.0], scale: vec![2.0, 0.0] };
        let mut row = [14.0, 3.0];
        scaler.transform(&mut row);
        assert_eq!(row, [2.0, 3.0]);
    }
}
