//! Sustainability Report
//!
//! Combines nutrient depletion, water balance, rotation partners and the
//! composite score for one crop on one soil sample.

use serde::Serialize;

use super::nutrients::{nutrient_depletion, NutrientDepletion};
use super::rotation::{rotation_plan, CropRotation};
use super::score::{recommendations, sustainability_score};
use super::tables::CropTables;
use super::water::{water_balance, WaterBalance};
use crate::error::ServiceError;
use crate::features::SoilSample;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SustainabilityReport {
    pub crop: String,
    pub sustainability_score: u8,
    pub nutrient_depletion: NutrientDepletion,
    pub water_risk: WaterBalance,
    pub crop_rotation: CropRotation,
    pub recommendations: Vec<String>,
}

/// Analyse the impact of growing `crop` for `duration_months` on `sample`
///
/// Fails only when the crop has no nutrient/water requirement entry.
pub fn analyze(
    tables: &CropTables,
    crop: &str,
    sample: &SoilSample,
    duration_months: u32,
) -> Result<SustainabilityReport, ServiceError> {
    let requirement = tables
        .requirement(crop)
        .ok_or_else(|| ServiceError::unknown_crop(crop))?;

    let depletion = nutrient_depletion(requirement, sample);
    let water = water_balance(requirement.water_mm, sample.rainfall, duration_months);
    let score = sustainability_score(&depletion, &water, sample.ph);
    let recommendations = recommendations(&depletion, &water, score);

    Ok(SustainabilityReport {
        crop: crop.to_string(),
        sustainability_score: score,
        nutrient_depletion: depletion,
        water_risk: water,
        crop_rotation: rotation_plan(tables, crop),
        recommendations,
    })
}
