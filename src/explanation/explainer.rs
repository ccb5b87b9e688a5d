//! Attribution Explainer
//!
//! Per-instance feature attributions for any crop label, normalised into
//! percentage shares and summarised in one sentence.

use serde::Serialize;

use super::narrative::narrate;
use super::tree_shap::forest_shap;
use crate::error::ServiceError;
use crate::features::{Feature, FeatureVector, FEATURE_COUNT};
use crate::model::{format_percent, CropModel};

/// How the shares were derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributionMethod {
    /// Instance-level Shapley values
    TreeShap,
    /// Shapley values were all zero; shares come from global importances
    GlobalImportance,
}

/// One feature's contribution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureAttribution {
    pub feature: Feature,
    /// Signed contribution to the class probability
    pub importance: f64,
    /// Percentage of total attribution magnitude
    pub share: f64,
    pub importance_percent: String,
}

impl FeatureAttribution {
    pub fn new(feature: Feature, importance: f64, share: f64) -> Self {
        Self {
            feature,
            importance,
            share,
            importance_percent: format_percent(share),
        }
    }
}

/// Explanation of one crop's probability for one input
#[derive(Debug, Clone, Serialize)]
pub struct Attribution {
    pub crop: String,
    pub explanation: String,
    /// Seven entries, largest magnitude first
    #[serde(rename = "importance_chart")]
    pub entries: Vec<FeatureAttribution>,
    /// Cover-weighted mean probability over the training data
    pub base_value: f64,
    /// Forest probability for `crop` on this input
    pub model_output: f64,
    pub method: AttributionMethod,
}

/// Explain `crop`'s probability, whether or not it is among the top predictions
pub fn explain(
    model: &CropModel,
    vector: &FeatureVector,
    crop: &str,
) -> Result<Attribution, ServiceError> {
    let class = model
        .label_index(crop)
        .ok_or_else(|| ServiceError::unknown_crop(crop))?;

    let x = model.model_input(vector);
    let forest = model.forest();
    let phi_by_column = forest_shap(forest, &x, class);
    let base_value = forest.expected_value(class);
    let model_output = forest.predict_proba(&x)[class];

    // Re-key column attributions onto canonical features
    let mut phi = [0.0; FEATURE_COUNT];
    for (column, feature) in model.columns().iter().enumerate() {
        phi[feature.index()] = phi_by_column[column];
    }

    let magnitude: f64 = phi.iter().map(|v| v.abs()).sum();
    let (weights, method) = if magnitude > 0.0 {
        (phi.map(f64::abs), AttributionMethod::TreeShap)
    } else {
        (fallback_weights(model), AttributionMethod::GlobalImportance)
    };

    let entries = rank(&phi, &weights);
    let explanation = narrate(crop, &entries, vector, method);

    tracing::debug!(
        "Explained {}: method={:?}, base={:.4}, output={:.4}",
        crop,
        method,
        base_value,
        model_output
    );

    Ok(Attribution {
        crop: crop.to_string(),
        explanation,
        entries,
        base_value,
        model_output,
        method,
    })
}

/// Global importance chart, highest first; uniform when the artifact has none
pub fn global_importance_chart(model: &CropModel) -> Vec<FeatureAttribution> {
    let weights = fallback_weights(model);
    rank(&weights, &weights)
}

/// Global importances keyed by feature, or a uniform split
fn fallback_weights(model: &CropModel) -> [f64; FEATURE_COUNT] {
    let mut weights = [1.0 / FEATURE_COUNT as f64; FEATURE_COUNT];
    if let Some(global) = model.global_importance() {
        if global.iter().map(|(_, v)| v).sum::<f64>() > 0.0 {
            for (feature, value) in global {
                weights[feature.index()] = value;
            }
        }
    }
    weights
}

/// Entries sorted by weight (ties in canonical order) with shares summing to 100
fn rank(importance: &[f64; FEATURE_COUNT], weights: &[f64; FEATURE_COUNT]) -> Vec<FeatureAttribution> {
    let total: f64 = weights.iter().sum();
    let mut entries: Vec<FeatureAttribution> = Feature::ALL
        .iter()
        .map(|f| {
            let i = f.index();
            FeatureAttribution::new(*f, importance[i], 100.0 * weights[i] / total)
        })
        .collect();
    // Stable sort keeps canonical order for ties
    entries.sort_by(|a, b| b.share.total_cmp(&a.share));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelArtifact;
    use approx::assert_relative_eq;
    use serde_json::json;

    /// Rainfall and nitrogen trees over [chickpea, maize, rice]
    fn model(with_importances: bool) -> CropModel {
        let mut artifact = json!({
            "feature_names": ["N", "P", "K", "pH", "temperature", "humidity", "rainfall"],
            "classes": ["chickpea", "maize", "rice"],
            "trees": [
                {
                    "children_left": [1, 3, -1, -1, -1],
                    "children_right": [2, 4, -1, -1, -1],
                    "feature": [6, 5, -2, -2, -2],
                    "threshold": [150.0, 70.0, -2.0, -2.0, -2.0],
                    "value": [[4.0, 8.0, 8.0], [4.0, 4.0, 0.0], [0.0, 4.0, 8.0], [4.0, 0.0, 0.0], [0.0, 4.0, 0.0]],
                    "cover": [20.0, 8.0, 12.0, 4.0, 4.0]
                },
                {
                    "children_left": [1, -1, -1],
                    "children_right": [2, -1, -1],
                    "feature": [0, -2, -2],
                    "threshold": [40.0, -2.0, -2.0],
                    "value": [[3.0, 3.0, 4.0], [6.0, 2.0, 2.0], [0.0, 4.0, 6.0]],
                    "cover": [20.0, 10.0, 10.0]
                }
            ]
        });
        if with_importances {
            artifact["feature_importances"] = json!([0.3, 0.0, 0.0, 0.0, 0.0, 0.2, 0.5]);
        }
        let artifact: ModelArtifact = serde_json::from_value(artifact).unwrap();
        CropModel::from_artifact(artifact).unwrap()
    }

    fn wet_field() -> FeatureVector {
        FeatureVector::from_array([90.0, 42.0, 43.0, 6.5, 20.8, 82.0, 202.0])
    }

    #[test]
    fn test_shares_sum_to_hundred() {
        let attribution = explain(&model(true), &wet_field(), "rice").unwrap();
        assert_eq!(attribution.entries.len(), FEATURE_COUNT);
        assert_eq!(attribution.method, AttributionMethod::TreeShap);
        let total: f64 = attribution.entries.iter().map(|e| e.share).sum();
        assert_relative_eq!(total, 100.0, epsilon = 0.01);
    }

    #[test]
    fn test_local_accuracy() {
        let m = model(true);
        for crop in ["chickpea", "maize", "rice"] {
            for vector in [
                wet_field(),
                FeatureVector::from_array([10.0, 42.0, 43.0, 6.5, 20.8, 50.0, 80.0]),
            ] {
                let a = explain(&m, &vector, crop).unwrap();
                let sum: f64 = a.entries.iter().map(|e| e.importance).sum();
                assert_relative_eq!(a.base_value + sum, a.model_output, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_rainfall_drives_rice() {
        let attribution = explain(&model(true), &wet_field(), "rice").unwrap();
        assert_eq!(attribution.entries[0].feature, Feature::Rainfall);
        assert!(attribution.entries[0].importance > 0.0);
        // Unused features carry nothing
        let potassium = attribution
            .entries
            .iter()
            .find(|e| e.feature == Feature::Potassium)
            .unwrap();
        assert_eq!(potassium.importance, 0.0);
        assert!(attribution.explanation.starts_with("High rainfall (202 mm)"));
        assert!(attribution.explanation.contains("rice"));
    }

    #[test]
    fn test_label_outside_top_k_is_explained() {
        let m = model(true);
        let top: Vec<String> = m
            .predict(&wet_field(), 1)
            .predictions
            .into_iter()
            .map(|p| p.crop)
            .collect();
        assert_eq!(top, ["rice"]);
        let attribution = explain(&m, &wet_field(), "chickpea").unwrap();
        assert!(attribution.entries[0].importance < 0.0);
        assert!(attribution.explanation.contains("works against chickpea")
            || attribution.explanation.contains("work against chickpea"));
    }

    #[test]
    fn test_unknown_crop() {
        let err = explain(&model(true), &wet_field(), "quinoa").unwrap_err();
        assert!(matches!(err, ServiceError::UnknownCrop { .. }));
    }

    #[test]
    fn test_explanations_are_deterministic() {
        let m = model(true);
        let a = explain(&m, &wet_field(), "maize").unwrap();
        let b = explain(&m, &wet_field(), "maize").unwrap();
        assert_eq!(a.entries, b.entries);
        assert_eq!(a.explanation, b.explanation);
    }

    #[test]
    fn test_zero_attribution_falls_back_to_global_importance() {
        // Single leaf: no feature can move the output
        let artifact: ModelArtifact = serde_json::from_value(json!({
            "feature_names": ["N", "P", "K", "pH", "temperature", "humidity", "rainfall"],
            "classes": ["rice", "maize"],
            "feature_importances": [0.1, 0.0, 0.0, 0.0, 0.0, 0.3, 0.6],
            "trees": [{
                "children_left": [-1], "children_right": [-1],
                "feature": [-2], "threshold": [-2.0],
                "value": [[1.0, 1.0]], "cover": [2.0]
            }]
        }))
        .unwrap();
        let m = CropModel::from_artifact(artifact).unwrap();
        let a = explain(&m, &wet_field(), "rice").unwrap();
        assert_eq!(a.method, AttributionMethod::GlobalImportance);
        assert_eq!(a.entries[0].feature, Feature::Rainfall);
        assert_relative_eq!(a.entries[0].share, 60.0, epsilon = 1e-9);
        assert_eq!(
            a.explanation,
            "Rainfall and humidity are the most influential factors for rice."
        );
        let total: f64 = a.entries.iter().map(|e| e.share).sum();
        assert_relative_eq!(total, 100.0, epsilon = 0.01);
    }

    #[test]
    fn test_uniform_chart_without_importances() {
        let chart = global_importance_chart(&model(false));
        assert_eq!(chart.len(), FEATURE_COUNT);
        assert_eq!(chart[0].feature, Feature::Nitrogen);
        assert_eq!(chart[6].feature, Feature::Rainfall);
        assert_eq!(chart[0].importance_percent, "14.3%");
    }

    #[test]
    fn test_attributions_map_back_from_model_columns() {
        // Rainfall is column 0 and standardised; N is column 6
        let artifact: ModelArtifact = serde_json::from_value(json!({
            "feature_names": ["rainfall", "humidity", "temperature", "pH", "K", "P", "N"],
            "classes": ["maize", "rice"],
            "scaler": {
                "mean": [200.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
                "scale": [10.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0]
            },
            "trees": [
                {
                    "children_left": [1, -1, -1],
                    "children_right": [2, -1, -1],
                    "feature": [0, -2, -2],
                    "threshold": [0.0, -2.0, -2.0],
                    "value": [[10.0, 10.0], [9.0, 1.0], [1.0, 9.0]],
                    "cover": [20.0, 10.0, 10.0]
                },
                {
                    "children_left": [1, -1, -1],
                    "children_right": [2, -1, -1],
                    "feature": [6, -2, -2],
                    "threshold": [40.0, -2.0, -2.0],
                    "value": [[10.0, 10.0], [8.0, 2.0], [2.0, 8.0]],
                    "cover": [20.0, 10.0, 10.0]
                }
            ]
        }))
        .unwrap();
        let m = CropModel::from_artifact(artifact).unwrap();

        let a = explain(&m, &wet_field(), "rice").unwrap();
        assert_eq!(a.method, AttributionMethod::TreeShap);
        assert_relative_eq!(a.model_output, 0.85, epsilon = 1e-12);
        assert_relative_eq!(a.base_value, 0.5, epsilon = 1e-12);

        let phi = |f: Feature| a.entries.iter().find(|e| e.feature == f).unwrap().importance;
        // Tree means: (0.9 - 0.5) / 2 and (0.8 - 0.5) / 2
        assert_relative_eq!(phi(Feature::Rainfall), 0.2, epsilon = 1e-12);
        assert_relative_eq!(phi(Feature::Nitrogen), 0.15, epsilon = 1e-12);
        assert_eq!(phi(Feature::Humidity), 0.0);
        assert_eq!(phi(Feature::Potassium), 0.0);
        assert_eq!(a.entries[0].feature, Feature::Rainfall);
    }

    #[test]
    fn test_serialized_shape() {
        let a = explain(&model(true), &wet_field(), "rice").unwrap();
        let value = serde_json::to_value(&a).unwrap();
        assert_eq!(value["method"], "tree_shap");
        assert_eq!(value["importance_chart"].as_array().unwrap().len(), 7);
        assert_eq!(value["importance_chart"][0]["feature"], "rainfall");
        assert!(value["importance_chart"][0]["importance_percent"]
            .as_str()
            .unwrap()
            .ends_with('%'));
    }
}
