//! Input validation utilities.
//!
//! Field-level checks that are not captured by the `clinica-types` wrappers: numeric ranges,
//! dates, and bounded free text.

use crate::constants::{HEIGHT_M_RANGE, WEIGHT_KG_RANGE};
use crate::{ClinicaError, ClinicaResult};
use chrono::NaiveDate;

fn validate_range(field: &str, value: f64, (min, max): (f64, f64), unit: &str) -> ClinicaResult<f64> {
    if !value.is_finite() || value < min || value > max {
        return Err(ClinicaError::InvalidInput(format!(
            "{field} must be between {min} and {max} {unit}"
        )));
    }
    Ok(value)
}

/// Validates an optional weight in kilograms against [`WEIGHT_KG_RANGE`].
pub fn validate_weight_kg(value: Option<f64>) -> ClinicaResult<Option<f64>> {
    value
        .map(|v| validate_range("weight", v, WEIGHT_KG_RANGE, "kg"))
        .transpose()
}

/// Validates an optional height in metres against [`HEIGHT_M_RANGE`].
pub fn validate_height_m(value: Option<f64>) -> ClinicaResult<Option<f64>> {
    value
        .map(|v| validate_range("height", v, HEIGHT_M_RANGE, "m"))
        .transpose()
}

/// Parses a `YYYY-MM-DD` birth date that must not lie after `today`.
pub fn parse_birth_date(value: &str, today: NaiveDate) -> ClinicaResult<NaiveDate> {
    let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        ClinicaError::InvalidInput(format!("birth date '{value}' is not a YYYY-MM-DD date"))
    })?;
    if date > today {
        return Err(ClinicaError::InvalidInput(
            "birth date cannot be in the future".into(),
        ));
    }
    Ok(date)
}

/// Trims `value` and enforces a maximum length in characters. Empty text is allowed.
pub fn bounded_text(field: &str, value: &str, max: usize) -> ClinicaResult<String> {
    let trimmed = value.trim();
    if trimmed.chars().count() > max {
        return Err(ClinicaError::InvalidInput(format!(
            "{field} exceeds maximum length of {max} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Normalises optional free text: surrounding whitespace is removed and blank becomes `None`.
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[test]
    fn weight_and_height_bounds() {
        assert_eq!(validate_weight_kg(Some(72.5)).unwrap(), Some(72.5));
        assert_eq!(validate_weight_kg(None).unwrap(), None);
        assert!(validate_weight_kg(Some(0.0)).is_err());
        assert!(validate_weight_kg(Some(f64::NAN)).is_err());
        assert!(validate_weight_kg(Some(501.0)).is_err());

        assert_eq!(validate_height_m(Some(1.75)).unwrap(), Some(1.75));
        assert!(validate_height_m(Some(175.0)).is_err(), "height is in metres");
    }

    #[test]
    fn birth_date_must_parse_and_not_be_future() {
        assert_eq!(
            parse_birth_date("1980-01-01", today()).unwrap(),
            NaiveDate::from_ymd_opt(1980, 1, 1).unwrap()
        );
        assert!(parse_birth_date("01/01/1980", today()).is_err());
        assert!(parse_birth_date("2030-01-01", today()).is_err());
    }

    #[test]
    fn bounded_text_trims_and_limits() {
        assert_eq!(bounded_text("sector", "  UCI ", 80).unwrap(), "UCI");
        assert_eq!(bounded_text("sector", "", 80).unwrap(), "");
        assert!(bounded_text("sector", &"x".repeat(81), 80).is_err());
    }

    #[test]
    fn optional_text_drops_blank_values() {
        assert_eq!(optional_text(Some("  ".into())), None);
        assert_eq!(optional_text(Some(" Penicilina ".into())), Some("Penicilina".into()));
        assert_eq!(optional_text(None), None);
    }
}
