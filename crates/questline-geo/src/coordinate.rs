//! Geodetic coordinates and their textual forms.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while building or parsing a coordinate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    /// The text matched neither the decimal nor the DMS pattern.
    #[error("unrecognised coordinate format: {0:?}")]
    UnrecognisedFormat(String),

    /// Latitude outside `[-90, 90]` or not finite.
    #[error("latitude out of range: {0}")]
    LatitudeOutOfRange(f64),

    /// Longitude outside `[-180, 180]` or not finite.
    #[error("longitude out of range: {0}")]
    LongitudeOutOfRange(f64),
}

/// A point on the Earth's surface in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CoordinateRepr")]
pub struct Coordinate {
    /// Latitude, positive north.
    pub latitude: f64,
    /// Longitude, positive east.
    pub longitude: f64,
}

impl Coordinate {
    /// Builds a coordinate, rejecting out-of-range or non-finite values.
    ///
    /// # Errors
    ///
    /// Returns `GeoError::LatitudeOutOfRange` or
    /// `GeoError::LongitudeOutOfRange`.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(GeoError::LatitudeOutOfRange(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(GeoError::LongitudeOutOfRange(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.7}, {:.7}", self.latitude, self.longitude)
    }
}

impl std::str::FromStr for Coordinate {
    type Err = GeoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_coordinate(s)
    }
}

/// Authored form of a coordinate: either text or an explicit pair.
#[derive(Deserialize)]
#[serde(untagged)]
enum CoordinateRepr {
    Text(String),
    Pair { latitude: f64, longitude: f64 },
}

impl TryFrom<CoordinateRepr> for Coordinate {
    type Error = GeoError;

    fn try_from(repr: CoordinateRepr) -> Result<Self, Self::Error> {
        match repr {
            CoordinateRepr::Text(text) => parse_coordinate(&text),
            CoordinateRepr::Pair {
                latitude,
                longitude,
            } => Self::new(latitude, longitude),
        }
    }
}

static DMS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?x)
        ^\s*
        (\d{1,2})\s*°\s*(\d{1,2})\s*['′]\s*(\d{1,2}(?:\.\d+)?)\s*["″]\s*([NSns])
        [\s,]*
        (\d{1,3})\s*°\s*(\d{1,2})\s*['′]\s*(\d{1,2}(?:\.\d+)?)\s*["″]\s*([EWew])
        \s*$"#,
    )
    .expect("DMS pattern is a valid regex")
});

static DECIMAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([+-]?\d+(?:\.\d+)?)\s*(?:,\s*|\s+)([+-]?\d+(?:\.\d+)?)\s*$")
        .expect("decimal pattern is a valid regex")
});

/// Parses decimal degrees (`33.6246728, -78.9573327`) or
/// degrees-minutes-seconds with hemispheres (`33°37'28"N 78°57'26"W`).
///
/// # Errors
///
/// Returns `GeoError::UnrecognisedFormat` when neither form matches and a
/// range error when the parsed values are not a valid position.
pub fn parse_coordinate(text: &str) -> Result<Coordinate, GeoError> {
    if let Some(caps) = DMS_PATTERN.captures(text) {
        let latitude = dms_to_decimal(&caps[1], &caps[2], &caps[3], &caps[4])?;
        let longitude = dms_to_decimal(&caps[5], &caps[6], &caps[7], &caps[8])?;
        return Coordinate::new(latitude, longitude);
    }

    if let Some(caps) = DECIMAL_PATTERN.captures(text) {
        let latitude = parse_number(&caps[1], text)?;
        let longitude = parse_number(&caps[2], text)?;
        return Coordinate::new(latitude, longitude);
    }

    Err(GeoError::UnrecognisedFormat(text.to_owned()))
}

fn dms_to_decimal(
    degrees: &str,
    minutes: &str,
    seconds: &str,
    hemisphere: &str,
) -> Result<f64, GeoError> {
    let value = parse_number(degrees, degrees)?
        + parse_number(minutes, minutes)? / 60.0
        + parse_number(seconds, seconds)? / 3600.0;
    if hemisphere.eq_ignore_ascii_case("S") || hemisphere.eq_ignore_ascii_case("W") {
        Ok(-value)
    } else {
        Ok(value)
    }
}

fn parse_number(digits: &str, source: &str) -> Result<f64, GeoError> {
    digits
        .parse::<f64>()
        .map_err(|_| GeoError::UnrecognisedFormat(source.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_parse_dms_with_west_hemisphere() {
        let coordinate = parse_coordinate(r#"33°37'28"N 78°57'26"W"#).unwrap();

        assert_close(coordinate.latitude, 33.0 + 37.0 / 60.0 + 28.0 / 3600.0);
        assert_close(coordinate.longitude, -(78.0 + 57.0 / 60.0 + 26.0 / 3600.0));
    }

    #[test]
    fn test_parse_dms_southern_eastern_with_fractional_seconds() {
        let coordinate = parse_coordinate(r#"33°52'4.5"S, 151°12'36"E"#).unwrap();

        assert_close(coordinate.latitude, -(33.0 + 52.0 / 60.0 + 4.5 / 3600.0));
        assert_close(coordinate.longitude, 151.0 + 12.0 / 60.0 + 36.0 / 3600.0);
    }

    #[test]
    fn test_parse_dms_with_typographic_primes() {
        let coordinate = parse_coordinate("33°37′28″N 78°57′26″W").unwrap();

        assert!(coordinate.latitude > 33.6);
        assert!(coordinate.longitude < -78.9);
    }

    #[test]
    fn test_parse_decimal_pair() {
        let coordinate = parse_coordinate("33.6246728, -78.9573327").unwrap();

        assert_close(coordinate.latitude, 33.624_672_8);
        assert_close(coordinate.longitude, -78.957_332_7);
    }

    #[test]
    fn test_parse_decimal_pair_separated_by_whitespace() {
        let coordinate = parse_coordinate("  -12.5   130.25 ").unwrap();

        assert_close(coordinate.latitude, -12.5);
        assert_close(coordinate.longitude, 130.25);
    }

    #[test]
    fn test_parse_garbage_returns_unrecognised_format() {
        let result = parse_coordinate("behind the big tree");

        assert_eq!(
            result,
            Err(GeoError::UnrecognisedFormat("behind the big tree".to_owned()))
        );
    }

    #[test]
    fn test_parse_out_of_range_latitude_is_rejected() {
        let result = parse_coordinate("91.0, 10.0");

        assert_eq!(result, Err(GeoError::LatitudeOutOfRange(91.0)));
    }

    #[test]
    fn test_new_rejects_non_finite_longitude() {
        assert!(matches!(
            Coordinate::new(0.0, f64::NAN),
            Err(GeoError::LongitudeOutOfRange(_))
        ));
    }

    #[test]
    fn test_from_str_delegates_to_parser() {
        let coordinate: Coordinate = "10, 20".parse().unwrap();

        assert_close(coordinate.latitude, 10.0);
        assert_close(coordinate.longitude, 20.0);
    }
}
