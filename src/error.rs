//! Domain Errors
//!
//! Every failure path of the core produces one of these variants. The HTTP
//! layer maps them to status codes in `api_server::AppError`.

use crate::features::Feature;
use std::fmt;
use thiserror::Error;

/// Constraint violated by an input field
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Key absent from the request
    Missing,
    /// Value present but not coercible to a finite number
    NotNumeric { got: String },
    /// Number outside the documented range
    OutOfRange { min: f64, max: f64, value: f64 },
    /// Value present but not an accepted integer
    NotInteger { got: String },
    /// Value present but not a string
    NotText { got: String },
}

/// Field-level validation failure
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field: String,
    pub constraint: Constraint,
}

impl ValidationError {
    pub fn missing(field: impl Into<String>) -> Self {
        Self { field: field.into(), constraint: Constraint::Missing }
    }

    pub fn not_numeric(feature: Feature, got: String) -> Self {
        Self { field: feature.name().to_string(), constraint: Constraint::NotNumeric { got } }
    }

    pub fn out_of_range(field: impl Into<String>, min: f64, max: f64, value: f64) -> Self {
        Self { field: field.into(), constraint: Constraint::OutOfRange { min, max, value } }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.constraint {
            Constraint::Missing => write!(f, "Missing required field: {}", self.field),
            Constraint::NotNumeric { got } => {
                write!(f, "Field '{}' must be a number, got: {}", self.field, got)
            }
            Constraint::OutOfRange { min, max, value } => write!(
                f,
                "Field '{}' must be between {} and {}, got: {}",
                self.field, min, max, value
            ),
            Constraint::NotInteger { got } => {
                write!(f, "Field '{}' must be a whole number, got: {}", self.field, got)
            }
            Constraint::NotText { got } => {
                write!(f, "Field '{}' must be a string, got: {}", self.field, got)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Failure of the external text-generation service
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("authentication rejected (HTTP {0})")]
    Auth(u16),
    #[error("quota exceeded (HTTP 429)")]
    Quota,
    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Core service error taxonomy
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Unknown crop: {crop}")]
    UnknownCrop { crop: String },

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Advice unavailable: {cause}")]
    AdviceUnavailable { cause: AdviceCause },
}

/// Underlying reason advice could not be produced
#[derive(Debug)]
pub enum AdviceCause {
    NotConfigured,
    Generation(GenerationError),
    EmptyResponse,
}

impl fmt::Display for AdviceCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdviceCause::NotConfigured => f.write_str("no text-generation API key configured"),
            AdviceCause::Generation(e) => write!(f, "{}", e),
            AdviceCause::EmptyResponse => f.write_str("text-generation service returned no text"),
        }
    }
}

impl From<GenerationError> for ServiceError {
    fn from(err: GenerationError) -> Self {
        ServiceError::AdviceUnavailable { cause: AdviceCause::Generation(err) }
    }
}

impl ServiceError {
    pub fn unknown_crop(crop: impl Into<String>) -> Self {
        ServiceError::UnknownCrop { crop: crop.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_field() {
        let e = ValidationError::out_of_range("pH", 0.0, 14.0, 14.01);
        assert_eq!(e.to_string(), "Field 'pH' must be between 0 and 14, got: 14.01");

        let e = ValidationError::missing("rainfall");
        assert!(e.to_string().contains("rainfall"));
    }

    #[test]
    fn test_generation_error_folds_into_advice_unavailable() {
        let err: ServiceError = GenerationError::Quota.into();
        assert!(matches!(
            err,
            ServiceError::AdviceUnavailable { cause: AdviceCause::Generation(GenerationError::Quota) }
        ));
        assert!(err.to_string().contains("quota"));
    }
}
