//! Crop Prediction Engine
//!
//! Wraps the loaded forest with its label encoding, column order and scaler.
//! Loaded once at startup and shared read-only behind an `Arc`.

use anyhow::Result;
use serde::Serialize;
use std::path::Path;

use super::artifact::{ModelArtifact, StandardScaler};
use super::forest::RandomForest;
use crate::error::ServiceError;
use crate::features::{Feature, FeatureVector};

/// Trained crop classifier
#[derive(Debug, Clone)]
pub struct CropModel {
    forest: RandomForest,
    classes: Vec<String>,
    columns: Vec<Feature>,
    scaler: Option<StandardScaler>,
    /// Normalised impurity importances indexed by column
    importances: Option<Vec<f64>>,
}

/// One ranked crop
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub crop: String,
    pub confidence: f64,
    pub confidence_percent: String,
}

/// Ranked top-K crops, confidence non-increasing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub predictions: Vec<Prediction>,
}

impl CropModel {
    /// Load and validate the artifact; any failure means the model is unavailable
    pub fn load(path: &Path) -> Result<Self, ServiceError> {
        ModelArtifact::load(path)
            .and_then(Self::from_artifact)
            .map_err(|e| ServiceError::ModelUnavailable(format!("{:#}", e)))
    }

    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self> {
        let columns = artifact.columns()?;
        let forest = artifact.build_forest()?;

        let importances = artifact.feature_importances.as_ref().and_then(|raw| {
            let total: f64 = raw.iter().map(|v| v.abs()).sum();
            (total > 0.0).then(|| raw.iter().map(|v| v.abs() / total).collect())
        });

        tracing::info!(
            "Loaded crop model: {} trees, {} classes, scaler: {}",
            forest.trees().len(),
            artifact.classes.len(),
            artifact.scaler.is_some()
        );

        Ok(Self {
            forest,
            classes: artifact.classes,
            columns,
            scaler: artifact.scaler,
            importances,
        })
    }

    /// Crop labels in encoding order
    pub fn labels(&self) -> &[String] {
        &self.classes
    }

    pub fn label_index(&self, crop: &str) -> Option<usize> {
        self.classes.iter().position(|c| c == crop)
    }

    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    /// Feature behind each model input column
    pub fn columns(&self) -> &[Feature] {
        &self.columns
    }

    /// Feature vector laid out in training column order and scaled
    pub fn model_input(&self, vector: &FeatureVector) -> Vec<f64> {
        let mut row: Vec<f64> = self.columns.iter().map(|f| vector.get(*f)).collect();
        if let Some(scaler) = &self.scaler {
            scaler.transform(&mut row);
        }
        row
    }

    /// Probability for every class, in label order
    pub fn predict_proba(&self, vector: &FeatureVector) -> Vec<f64> {
        self.forest.predict_proba(&self.model_input(vector))
    }

    /// Top-K crops; `top_k` is clamped to `1..=labels().len()`
    pub fn predict(&self, vector: &FeatureVector, top_k: usize) -> PredictionResult {
        let proba = self.predict_proba(vector);
        let k = top_k.clamp(1, self.classes.len());

        let mut ranked: Vec<usize> = (0..proba.len()).collect();
        // Stable sort keeps label order for ties
        ranked.sort_by(|&a, &b| proba[b].total_cmp(&proba[a]));

        let predictions = ranked
            .into_iter()
            .take(k)
            .map(|i| Prediction {
                crop: self.classes[i].clone(),
                confidence: proba[i],
                confidence_percent: format_percent(proba[i] * 100.0),
            })
            .collect();

        PredictionResult { predictions }
    }

    /// Global importance per feature, highest first
    pub fn global_importance(&self) -> Option<Vec<(Feature, f64)>> {
        let importances = self.importances.as_ref()?;
        let mut pairs: Vec<(Feature, f64)> = self
            .columns
            .iter()
            .copied()
            .zip(importances.iter().copied())
            .collect();
        pairs.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        Some(pairs)
    }
}

/// "85.3%" style display string
pub fn format_percent(percent: f64) -> String {
    format!("{:.1}%", percent)
}
