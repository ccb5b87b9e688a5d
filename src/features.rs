//! Soil and Climate Features
//!
//! The seven measurements the classifier is trained on, in canonical column
//! order, together with their physical validity ranges and the narrower
//! envelope covered by the training data.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Input measurement identifier
///
/// Declaration order is the canonical training column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Feature {
    #[serde(rename = "N")]
    Nitrogen,
    #[serde(rename = "P")]
    Phosphorus,
    #[serde(rename = "K")]
    Potassium,
    #[serde(rename = "pH")]
    Ph,
    #[serde(rename = "temperature")]
    Temperature,
    #[serde(rename = "humidity")]
    Humidity,
    #[serde(rename = "rainfall")]
    Rainfall,
}

/// Number of model input features
pub const FEATURE_COUNT: usize = 7;

impl Feature {
    pub const ALL: [Feature; FEATURE_COUNT] = [
        Feature::Nitrogen,
        Feature::Phosphorus,
        Feature::Potassium,
        Feature::Ph,
        Feature::Temperature,
        Feature::Humidity,
        Feature::Rainfall,
    ];

    /// Wire name used in requests, responses and the model artifact
    pub fn name(&self) -> &'static str {
        match self {
            Feature::Nitrogen => "N",
            Feature::Phosphorus => "P",
            Feature::Potassium => "K",
            Feature::Ph => "pH",
            Feature::Temperature => "temperature",
            Feature::Humidity => "humidity",
            Feature::Rainfall => "rainfall",
        }
    }

    /// Human-readable name for narrative text
    pub fn display_name(&self) -> &'static str {
        match self {
            Feature::Nitrogen => "nitrogen",
            Feature::Phosphorus => "phosphorus",
            Feature::Potassium => "potassium",
            Feature::Ph => "soil pH",
            Feature::Temperature => "temperature",
            Feature::Humidity => "humidity",
            Feature::Rainfall => "rainfall",
        }
    }

    pub fn from_name(name: &str) -> Option<Feature> {
        Feature::ALL.iter().copied().find(|f| f.name() == name)
    }

    /// Position in the canonical column order
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Physically valid range (inclusive)
    pub fn physical_range(&self) -> (f64, f64) {
        match self {
            Feature::Nitrogen | Feature::Phosphorus | Feature::Potassium => (0.0, 1000.0),
            Feature::Ph => (0.0, 14.0),
            Feature::Temperature => (-50.0, 60.0),
            Feature::Humidity => (0.0, 100.0),
            Feature::Rainfall => (0.0, 5000.0),
        }
    }

    /// Range covered by the training dataset (inclusive)
    ///
    /// Values outside it are valid but the classifier is extrapolating.
    pub fn training_range(&self) -> (f64, f64) {
        match self {
            Feature::Nitrogen => (0.0, 140.0),
            Feature::Phosphorus => (5.0, 145.0),
            Feature::Potassium => (5.0, 205.0),
            Feature::Ph => (3.5, 9.5),
            Feature::Temperature => (8.0, 45.0),
            Feature::Humidity => (14.0, 100.0),
            Feature::Rainfall => (20.0, 300.0),
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Feature::Nitrogen | Feature::Phosphorus | Feature::Potassium => " kg/ha",
            Feature::Ph => "",
            Feature::Temperature => "°C",
            Feature::Humidity => "%",
            Feature::Rainfall => " mm",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Validated soil/climate measurements for a single request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    #[serde(rename = "N")]
    pub nitrogen: f64,
    #[serde(rename = "P")]
    pub phosphorus: f64,
    #[serde(rename = "K")]
    pub potassium: f64,
    #[serde(rename = "pH")]
    pub ph: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub rainfall: f64,
}

impl FeatureVector {
    /// Build from values in canonical order
    pub fn from_array(values: [f64; FEATURE_COUNT]) -> Self {
        Self {
            nitrogen: values[0],
            phosphorus: values[1],
            potassium: values[2],
            ph: values[3],
            temperature: values[4],
            humidity: values[5],
            rainfall: values[6],
        }
    }

    pub fn get(&self, feature: Feature) -> f64 {
        match feature {
            Feature::Nitrogen => self.nitrogen,
            Feature::Phosphorus => self.phosphorus,
            Feature::Potassium => self.potassium,
            Feature::Ph => self.ph,
            Feature::Temperature => self.temperature,
            Feature::Humidity => self.humidity,
            Feature::Rainfall => self.rainfall,
        }
    }

    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        Feature::ALL.map(|f| self.get(f))
    }

    /// Features lying outside the training envelope
    pub fn outside_training_range(&self) -> Vec<Feature> {
        Feature::ALL
            .iter()
            .copied()
            .filter(|f| {
                let (min, max) = f.training_range();
                let v = self.get(*f);
                v < min || v > max
            })
            .collect()
    }
}

/// Soil sample used by the sustainability analysis (no temperature/humidity)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoilSample {
    #[serde(rename = "N")]
    pub nitrogen: f64,
    #[serde(rename = "P")]
    pub phosphorus: f64,
    #[serde(rename = "K")]
    pub potassium: f64,
    #[serde(rename = "pH")]
    pub ph: f64,
    pub rainfall: f64,
}

impl SoilSample {
    pub const FIELDS: [Feature; 5] = [
        Feature::Nitrogen,
        Feature::Phosphorus,
        Feature::Potassium,
        Feature::Ph,
        Feature::Rainfall,
    ];
}
