use crate::error::{ConversionError, Result};

/// Parse a decimal-degree coordinate cell.
///
/// Blank cells yield `Ok(None)` so callers can apply their own fallback.
/// Non-finite values are rejected along with anything that is not a number.
///
/// # Examples
/// ```
/// use tafl_gpkg::utils::coordinates::parse_coordinate;
///
/// assert_eq!(parse_coordinate(" 45.5017 ").unwrap(), Some(45.5017));
/// assert_eq!(parse_coordinate("").unwrap(), None);
/// assert!(parse_coordinate("45N").is_err());
/// ```
pub fn parse_coordinate(coord_str: &str) -> Result<Option<f64>> {
    let trimmed = coord_str.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    trimmed
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(Some)
        .ok_or_else(|| {
            ConversionError::InvalidFormat(format!("Invalid coordinate value: '{}'", coord_str))
        })
}

/// Parse a coordinate cell, treating a blank cell as 0.0.
pub fn parse_coordinate_or_zero(coord_str: &str) -> Result<f64> {
    Ok(parse_coordinate(coord_str)?.unwrap_or(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_coordinate() {
        assert_eq!(parse_coordinate("51.5074").unwrap(), Some(51.5074));
        assert_eq!(parse_coordinate(" -0.1278 ").unwrap(), Some(-0.1278));
        assert_eq!(parse_coordinate("-73").unwrap(), Some(-73.0));
        assert_eq!(parse_coordinate("   ").unwrap(), None);
    }

    #[test]
    fn test_invalid_coordinates() {
        assert!(parse_coordinate("45:30:00").is_err());
        assert!(parse_coordinate("inf").is_err());
        assert!(parse_coordinate("NaN").is_err());
        assert!(parse_coordinate("forty five").is_err());
    }

    #[test]
    fn test_blank_defaults_to_zero() {
        assert_eq!(parse_coordinate_or_zero("").unwrap(), 0.0);
        assert_eq!(parse_coordinate_or_zero("12.5").unwrap(), 12.5);
        assert!(parse_coordinate_or_zero("x").is_err());
    }
}
