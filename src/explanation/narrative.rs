//! Narrative Generation
//!
//! Turns the strongest attributions into one plain-language sentence.

use super::explainer::{AttributionMethod, FeatureAttribution};
use crate::features::{Feature, FeatureVector};

/// Qualitative reading of a measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    Moderate,
    High,
    Acidic,
    Neutral,
    Alkaline,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Low => "low",
            Level::Moderate => "moderate",
            Level::High => "high",
            Level::Acidic => "acidic",
            Level::Neutral => "neutral",
            Level::Alkaline => "alkaline",
        }
    }
}

/// Agronomic band for a measurement
pub fn level(feature: Feature, value: f64) -> Level {
    let (moderate, high) = match feature {
        Feature::Ph => {
            return if value < 6.0 {
                Level::Acidic
            } else if value <= 7.5 {
                Level::Neutral
            } else {
                Level::Alkaline
            };
        }
        Feature::Rainfall => (100.0, 200.0),
        Feature::Humidity => (60.0, 80.0),
        Feature::Temperature => (20.0, 30.0),
        Feature::Nitrogen => (40.0, 80.0),
        Feature::Phosphorus => (30.0, 60.0),
        Feature::Potassium => (20.0, 40.0),
    };

    if value > high {
        Level::High
    } else if value > moderate {
        Level::Moderate
    } else {
        Level::Low
    }
}

/// "high rainfall (202 mm)", "neutral soil pH (6.5)"
pub fn describe(feature: Feature, value: f64) -> String {
    let shown = match feature {
        Feature::Ph | Feature::Temperature => format!("{:.1}{}", value, feature.unit()),
        _ => format!("{:.0}{}", value, feature.unit()),
    };
    format!("{} {} ({})", level(feature, value).as_str(), feature.display_name(), shown)
}

/// One sentence naming the top one or two drivers for `crop`
pub fn narrate(
    crop: &str,
    entries: &[FeatureAttribution],
    vector: &FeatureVector,
    method: AttributionMethod,
) -> String {
    if method == AttributionMethod::GlobalImportance {
        return match entries {
            [] => format!("No single factor stands out for {}.", crop),
            [only] => format!(
                "{} is the most influential factor for {}.",
                capitalize(only.feature.display_name()),
                crop
            ),
            [first, second, ..] => format!(
                "{} and {} are the most influential factors for {}.",
                capitalize(first.feature.display_name()),
                second.feature.display_name(),
                crop
            ),
        };
    }

    let drivers: Vec<&FeatureAttribution> = entries
        .iter()
        .filter(|e| e.importance != 0.0)
        .take(2)
        .collect();

    let phrase = |e: &FeatureAttribution| describe(e.feature, vector.get(e.feature));

    match drivers.as_slice() {
        [] => format!("No single factor stands out for {}.", crop),
        [only] => format!("{} {} {}.", capitalize(&phrase(only)), verb(only, false), crop),
        [first, second] if favors(first) == favors(second) => format!(
            "{} and {} {} {}.",
            capitalize(&phrase(first)),
            phrase(second),
            verb(first, true),
            crop
        ),
        [first, second, ..] => format!(
            "{} {} {}, while {} {} it.",
            capitalize(&phrase(first)),
            verb(first, false),
            crop,
            phrase(second),
            verb(second, false)
        ),
    }
}

fn favors(entry: &FeatureAttribution) -> bool {
    entry.importance >= 0.0
}

fn verb(entry: &FeatureAttribution, plural: bool) -> &'static str {
    match (favors(entry), plural) {
        (true, false) => "favors",
        (true, true) => "favor",
        (false, false) => "works against",
        (false, true) => "work against",
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
