//! Numeric checks shared by form submission and restore.

use crate::{FormField, ValidationError};

/// Parse a raw form value as a finite number
///
/// Blank input is rejected the same way as non-numeric input.
pub fn parse_finite(field: FormField, raw: &str) -> Result<f64, ValidationError> {
    let value = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| ValidationError::NotANumber(field))?;
    require_finite(field, value)
}

/// Parse a raw form value as a finite number greater than zero
pub fn parse_positive(field: FormField, raw: &str) -> Result<f64, ValidationError> {
    let value = parse_finite(field, raw)?;
    require_positive(field, value)
}

pub fn require_finite(field: FormField, value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ValidationError::NotANumber(field))
    }
}

pub fn require_positive(field: FormField, value: f64) -> Result<f64, ValidationError> {
    let value = require_finite(field, value)?;
    if value > 0.0 {
        Ok(value)
    } else {
        Err(ValidationError::NotPositive(field))
    }
}
