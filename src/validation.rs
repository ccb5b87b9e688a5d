//! Input Validation
//!
//! Turns raw JSON request bodies into validated feature vectors. Checks run
//! in three passes over the requested fields (presence, numeric coercion,
//! physical range) and the first failure wins.

use serde_json::{Map, Value};

use crate::error::{Constraint, ServiceError, ValidationError};
use crate::features::{Feature, FeatureVector, SoilSample, FEATURE_COUNT};

/// Default growing duration for the water balance
pub const DEFAULT_DURATION_MONTHS: u32 = 4;

/// Validate all seven model features
pub fn validate(raw: &Map<String, Value>) -> Result<FeatureVector, ValidationError> {
    let values = validate_fields(raw, &Feature::ALL)?;
    let mut array = [0.0; FEATURE_COUNT];
    array.copy_from_slice(&values);
    Ok(FeatureVector::from_array(array))
}

/// Validate the five fields the sustainability analysis consumes
pub fn validate_soil_sample(raw: &Map<String, Value>) -> Result<SoilSample, ValidationError> {
    let v = validate_fields(raw, &SoilSample::FIELDS)?;
    Ok(SoilSample {
        nitrogen: v[0],
        phosphorus: v[1],
        potassium: v[2],
        ph: v[3],
        rainfall: v[4],
    })
}

/// Validate a subset of features, returning values in the order given
pub fn validate_fields(
    raw: &Map<String, Value>,
    fields: &[Feature],
) -> Result<Vec<f64>, ValidationError> {
    // 1. presence
    if let Some(missing) = fields.iter().find(|f| !raw.contains_key(f.name())) {
        return Err(ValidationError::missing(missing.name()));
    }

    // 2. numeric coercion
    let mut values = Vec::with_capacity(fields.len());
    for feature in fields {
        let value = &raw[feature.name()];
        match coerce_f64(value) {
            Some(v) => values.push(v),
            None => return Err(ValidationError::not_numeric(*feature, value.to_string())),
        }
    }

    // 3. physical range
    for (feature, value) in fields.iter().zip(&values) {
        let (min, max) = feature.physical_range();
        if !(min..=max).contains(value) {
            return Err(ValidationError::out_of_range(feature.name(), min, max, *value));
        }
    }

    Ok(values)
}

/// Optional `duration_months`: whole number of months in 1..=12
pub fn validate_duration(raw: &Map<String, Value>) -> Result<u32, ValidationError> {
    let Some(value) = raw.get("duration_months") else {
        return Ok(DEFAULT_DURATION_MONTHS);
    };
    if value.is_null() {
        return Ok(DEFAULT_DURATION_MONTHS);
    }

    let not_integer = || ValidationError {
        field: "duration_months".to_string(),
        constraint: Constraint::NotInteger { got: value.to_string() },
    };

    let months = coerce_f64(value).ok_or_else(not_integer)?;
    if months.fract() != 0.0 {
        return Err(not_integer());
    }
    if !(1.0..=12.0).contains(&months) {
        return Err(ValidationError::out_of_range("duration_months", 1.0, 12.0, months));
    }
    Ok(months as u32)
}

/// Optional `top_k`; absent or null gives `default`
///
/// Any finite number is accepted and floored; clamping to the label count
/// happens at prediction time.
pub fn validate_top_k(raw: &Map<String, Value>, default: usize) -> Result<usize, ValidationError> {
    let value = match raw.get("top_k") {
        None | Some(Value::Null) => return Ok(default),
        Some(value) => value,
    };

    let k = coerce_f64(value).ok_or_else(|| ValidationError {
        field: "top_k".to_string(),
        constraint: Constraint::NotNumeric { got: value.to_string() },
    })?;
    Ok(k.floor().max(0.0) as usize)
}

/// Extract and check the `crop` field against the known label set
pub fn validate_crop<'a>(
    raw: &Map<String, Value>,
    labels: impl IntoIterator<Item = &'a str>,
) -> Result<String, ServiceError> {
    let crop = match raw.get("crop") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_lowercase(),
        None | Some(Value::Null) | Some(Value::String(_)) => {
            return Err(ValidationError::missing("crop").into())
        }
        Some(other) => {
            return Err(ValidationError {
                field: "crop".to_string(),
                constraint: Constraint::NotText { got: other.to_string() },
            }
            .into())
        }
    };

    if labels.into_iter().any(|label| label == crop) {
        Ok(crop)
    } else {
        Err(ServiceError::unknown_crop(crop))
    }
}

/// Coerce a JSON value to a finite float
///
/// Accepts numbers and numeric strings. Booleans, null, containers and
/// non-finite values are rejected.
fn coerce_f64(value: &Value) -> Option<f64> {
    let v = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    v.is_finite().then_some(v)
}
