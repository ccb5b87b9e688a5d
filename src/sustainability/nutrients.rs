//! Nutrient depletion estimate for one growing season.

use serde::Serialize;

use super::tables::CropRequirement;
use crate::features::SoilSample;

/// N/P/K triple
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NutrientLevels {
    #[serde(rename = "N")]
    pub n: f64,
    #[serde(rename = "P")]
    pub p: f64,
    #[serde(rename = "K")]
    pub k: f64,
}

impl NutrientLevels {
    pub fn mean(&self) -> f64 {
        (self.n + self.p + self.k) / 3.0
    }

    fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self { n: f(self.n), p: f(self.p), k: f(self.k) }
    }

    fn zip_with(&self, other: &Self, f: impl Fn(f64, f64) -> f64) -> Self {
        Self {
            n: f(self.n, other.n),
            p: f(self.p, other.p),
            k: f(self.k, other.k),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DepletionSeverity {
    Low,
    Moderate,
    High,
    Severe,
}

impl DepletionSeverity {
    /// Band for the mean uptake-to-level ratio in percent
    pub fn from_mean_ratio(mean: f64) -> Self {
        if mean > 70.0 {
            DepletionSeverity::Severe
        } else if mean > 50.0 {
            DepletionSeverity::High
        } else if mean > 30.0 {
            DepletionSeverity::Moderate
        } else {
            DepletionSeverity::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutrientDepletion {
    /// Crop uptake over the season
    pub consumption: NutrientLevels,
    /// Soil level left after harvest, floored at zero
    pub remaining: NutrientLevels,
    /// Uptake as a percentage of the current level, clamped to [0, 100]
    pub depletion_percent: NutrientLevels,
    pub severity: DepletionSeverity,
}

pub fn nutrient_depletion(requirement: &CropRequirement, sample: &SoilSample) -> NutrientDepletion {
    let consumption = NutrientLevels {
        n: requirement.n,
        p: requirement.p,
        k: requirement.k,
    };
    let level = NutrientLevels {
        n: sample.nitrogen,
        p: sample.phosphorus,
        k: sample.potassium,
    };

    let remaining = level.zip_with(&consumption, |have, used| (have - used).max(0.0));
    // Levels below 1 kg/ha are treated as 1 to keep the ratio finite
    let ratio = consumption.zip_with(&level, |used, have| 100.0 * used / have.max(1.0));
    let depletion_percent = ratio.map(|r| r.clamp(0.0, 100.0));

    NutrientDepletion {
        consumption,
        remaining,
        depletion_percent,
        severity: DepletionSeverity::from_mean_ratio(ratio.mean()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rice() -> CropRequirement {
        CropRequirement { n: 120.0, p: 60.0, k: 60.0, water_mm: 1200.0 }
    }

    fn sample(n: f64, p: f64, k: f64) -> SoilSample {
        SoilSample { nitrogen: n, phosphorus: p, potassium: k, ph: 6.5, rainfall: 200.0 }
    }

    #[test]
    fn test_rich_soil() {
        let d = nutrient_depletion(&rice(), &sample(240.0, 240.0, 300.0));
        assert_relative_eq!(d.depletion_percent.n, 50.0);
        assert_relative_eq!(d.depletion_percent.p, 25.0);
        assert_relative_eq!(d.depletion_percent.k, 20.0);
        assert_relative_eq!(d.remaining.n, 120.0);
        // mean ratio 31.67
        assert_eq!(d.severity, DepletionSeverity::Moderate);
    }

    #[test]
    fn test_poor_soil_is_clamped_but_severity_uses_raw_ratio() {
        let d = nutrient_depletion(&rice(), &sample(0.0, 30.0, 90.0));
        assert_eq!(d.depletion_percent.n, 100.0);
        assert_eq!(d.depletion_percent.p, 100.0);
        assert_relative_eq!(d.depletion_percent.k, 200.0 / 3.0);
        assert_eq!(d.remaining.n, 0.0);
        assert_eq!(d.remaining.p, 0.0);
        assert_eq!(d.severity, DepletionSeverity::Severe);
    }

    #[test]
    fn test_depletion_always_within_bounds() {
        for level in [0.0, 0.5, 1.0, 10.0, 119.0, 1000.0] {
            let d = nutrient_depletion(&rice(), &sample(level, level, level));
            for v in [d.depletion_percent.n, d.depletion_percent.p, d.depletion_percent.k] {
                assert!((0.0..=100.0).contains(&v));
            }
        }
    }

    #[test]
    fn test_severity_bands() {
        assert_eq!(DepletionSeverity::from_mean_ratio(30.0), DepletionSeverity::Low);
        assert_eq!(DepletionSeverity::from_mean_ratio(50.0), DepletionSeverity::Moderate);
        assert_eq!(DepletionSeverity::from_mean_ratio(70.0), DepletionSeverity::High);
        assert_eq!(DepletionSeverity::from_mean_ratio(70.1), DepletionSeverity::Severe);
    }
}
