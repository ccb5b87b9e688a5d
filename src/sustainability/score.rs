//! Composite sustainability score and follow-up recommendations.

use super::nutrients::NutrientDepletion;
use super::water::{WaterBalance, WaterRisk};

const DEPLETION_WEIGHT: f64 = 0.3;
const HIGH_WATER_PENALTY: f64 = 20.0;
const MODERATE_WATER_PENALTY: f64 = 10.0;
const NEUTRAL_PH_BONUS: f64 = 5.0;
const NEUTRAL_PH: (f64, f64) = (6.0, 7.5);

/// Nutrient depletion above this percentage triggers fertiliser advice
const FERTILIZER_THRESHOLD: f64 = 50.0;
const DRAINAGE_SURPLUS_MM: f64 = 300.0;
const ROTATION_SCORE_THRESHOLD: u8 = 60;

/// Score in 0..=100; higher is more sustainable
pub fn sustainability_score(depletion: &NutrientDepletion, water: &WaterBalance, ph: f64) -> u8 {
    let mut score = 100.0 - DEPLETION_WEIGHT * depletion.depletion_percent.mean();

    score -= match water.risk_level {
        WaterRisk::High => HIGH_WATER_PENALTY,
        WaterRisk::Moderate => MODERATE_WATER_PENALTY,
        WaterRisk::Low => 0.0,
    };

    if (NEUTRAL_PH.0..=NEUTRAL_PH.1).contains(&ph) {
        score += NEUTRAL_PH_BONUS;
    }

    score.clamp(0.0, 100.0).round() as u8
}

pub fn recommendations(depletion: &NutrientDepletion, water: &WaterBalance, score: u8) -> Vec<String> {
    let mut out = Vec::new();
    let pct = &depletion.depletion_percent;

    if pct.n > FERTILIZER_THRESHOLD {
        out.push("Apply nitrogen-rich fertilizers or compost before next planting");
    }
    if pct.p > FERTILIZER_THRESHOLD {
        out.push("Add phosphate fertilizers to restore phosphorus levels");
    }
    if pct.k > FERTILIZER_THRESHOLD {
        out.push("Use potash or wood ash to replenish potassium");
    }

    if water.risk_level == WaterRisk::High {
        out.push("Install drip irrigation system to conserve water");
        out.push("Use mulching to reduce water evaporation");
    } else if water.surplus > DRAINAGE_SURPLUS_MM {
        out.push("Ensure proper drainage to prevent waterlogging");
    }

    if score < ROTATION_SCORE_THRESHOLD {
        out.push("Consider crop rotation to improve soil health");
        out.push("Add organic matter to enhance soil structure");
    }

    if out.is_empty() {
        out.push("Maintain current sustainable practices");
    }
    out.into_iter().map(String::from).collect()
}
