//! Seasonal water balance.

use serde::Serialize;
use std::fmt;

/// Rainfall adequacy for a crop's seasonal need
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WaterRisk {
    Low,
    Moderate,
    High,
}

impl fmt::Display for WaterRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WaterRisk::Low => "low",
            WaterRisk::Moderate => "moderate",
            WaterRisk::High => "high",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaterBalance {
    /// Crop need over the season (mm)
    pub water_need: f64,
    /// Monthly rainfall times season length (mm)
    pub available_water: f64,
    pub deficit: f64,
    pub surplus: f64,
    pub risk_level: WaterRisk,
    pub message: String,
}

/// Classify rainfall against a crop's seasonal need
///
/// `rainfall` is a monthly mean, so supply over the season is
/// `rainfall * duration_months`.
pub fn water_balance(water_need: f64, rainfall: f64, duration_months: u32) -> WaterBalance {
    let available_water = rainfall * f64::from(duration_months);
    let deficit = (water_need - available_water).max(0.0);
    let surplus = (available_water - water_need).max(0.0);

    let (risk_level, message) = if deficit > 400.0 {
        (WaterRisk::High, format!("Significant irrigation needed ({:.0} mm deficit)", deficit))
    } else if deficit > 200.0 {
        (WaterRisk::Moderate, format!("Moderate irrigation required ({:.0} mm deficit)", deficit))
    } else if surplus > 400.0 {
        (WaterRisk::Moderate, format!("Excess water may cause issues ({:.0} mm surplus)", surplus))
    } else {
        (WaterRisk::Low, "Water availability is adequate".to_string())
    };

    WaterBalance {
        water_need,
        available_water,
        deficit,
        surplus,
        risk_level,
        message,
    }
}
