//! Crop rotation lookup.

use serde::Serialize;

use super::tables::{CropTables, RotationSuggestion};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CropRotation {
    pub current_crop: String,
    /// Empty when the crop has no documented rotation partners
    pub suggestions: Vec<RotationSuggestion>,
}

pub fn rotation_plan(tables: &CropTables, crop: &str) -> CropRotation {
    CropRotation {
        current_crop: crop.to_string(),
        suggestions: tables.rotations(crop).to_vec(),
    }
}
