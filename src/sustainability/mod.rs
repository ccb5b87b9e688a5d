//! Rule-based soil impact analysis. No model dependency; every constant comes
//! from the crop tables or the scoring rules in `score`.

pub mod nutrients;
pub mod report;
pub mod rotation;
pub mod score;
pub mod tables;
pub mod water;

pub use nutrients::{nutrient_depletion, DepletionSeverity, NutrientDepletion, NutrientLevels};
pub use report::{analyze, SustainabilityReport};
pub use rotation::{rotation_plan, CropRotation};
pub use score::{recommendations, sustainability_score};
pub use tables::{CropRequirement, CropTables, RotationSuggestion};
pub use water::{water_balance, WaterBalance, WaterRisk};
