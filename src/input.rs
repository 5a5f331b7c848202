//! Operator-supplied scalar parsing
//!
//! Setpoint, sampling interval and gains arrive as free text from whatever
//! front end drives the pipeline. Blank or non-numeric values are rejected
//! before any log is scanned.

use crate::{Error, Result};

/// Parse a named numeric field.
///
/// Leading/trailing whitespace is ignored.
///
/// # Errors
///
/// Returns [`Error::Input`] naming `field` when the text is blank, not a
/// number, or not finite.
pub fn parse_scalar(field: &str, raw: &str) -> Result<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::Input(format!("{field} is required")));
    }
    let value: f64 = trimmed
        .parse()
        .map_err(|_| Error::Input(format!("{field} must be a number, got {trimmed:?}")))?;
    if !value.is_finite() {
        return Err(Error::Input(format!("{field} must be finite, got {trimmed}")));
    }
    Ok(value)
}

/// Parse a positive sampling interval.
///
/// # Errors
///
/// Returns [`Error::Input`] when the text is not a positive finite number
pub fn parse_sampling_interval(raw: &str) -> Result<f64> {
    let value = parse_scalar("sampling interval", raw)?;
    if value <= 0.0 {
        return Err(Error::Input(format!(
            "sampling interval must be positive, got {value}"
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scalar_trims() {
        assert!((parse_scalar("setpoint", " 37.5 \n").unwrap() - 37.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_scalar_blank() {
        let err = parse_scalar("setpoint", "   ").unwrap_err();
        assert!(format!("{err}").contains("setpoint is required"));
    }

    #[test]
    fn test_parse_scalar_garbage() {
        let err = parse_scalar("Kp", "abc").unwrap_err();
        assert!(matches!(err, Error::Input(ref msg) if msg.contains("Kp")));
    }

    #[test]
    fn test_parse_scalar_rejects_nan() {
        assert!(parse_scalar("Ki", "NaN").is_err());
        assert!(parse_scalar("Ki", "inf").is_err());
    }

    #[test]
    fn test_parse_sampling_interval() {
        assert!((parse_sampling_interval("5").unwrap() - 5.0).abs() < f64::EPSILON);
        assert!(parse_sampling_interval("0").is_err());
        assert!(parse_sampling_interval("-1").is_err());
    }
}
