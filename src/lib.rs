//! Crop Advisor
//!
//! Crop recommendation service: a random-forest classifier over seven soil
//! and climate measurements, with per-prediction explanations, rule-based
//! sustainability analysis and optional AI agronomist advice.
//!
//! - `features` / `validation`: the seven inputs and request validation
//! - `model/`: artifact loading, forest evaluation, top-K ranking
//! - `explanation/`: TreeSHAP attributions and narrative
//! - `sustainability/`: nutrient, water, rotation and score rules over CSV tables
//! - `advisory/`: prompt, text generation and reply parsing
//! - `api_server`: Axum HTTP layer (feature `api`)

pub mod advisory;
pub mod api_server;
pub mod config;
pub mod error;
pub mod explanation;
pub mod features;
pub mod model;
pub mod sustainability;
pub mod validation;

// Re-export commonly used types
pub use config::Config;
pub use error::{AdviceCause, Constraint, GenerationError, ServiceError, ValidationError};
pub use explanation::{explain, Attribution, AttributionMethod, FeatureAttribution};
pub use features::{Feature, FeatureVector, SoilSample, FEATURE_COUNT};
pub use model::{CropModel, ModelArtifact, Prediction, PredictionResult};
pub use sustainability::{analyze, CropTables, SustainabilityReport, WaterRisk};
pub use validation::{validate, validate_soil_sample};

#[cfg(feature = "api")]
pub use api_server::{create_router, AppError, AppState};
#[cfg(feature = "api")]
pub use advisory::{AdvisoryGateway, TextGenerator};
