//! Geographic points and coordinate strings.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{PosterError, PosterResult};

/// A WGS84 coordinate pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Validate ranges; NaN is rejected along with out-of-range values.
    pub fn validated(lat: f64, lon: f64) -> PosterResult<Self> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(PosterError::invalid("latitude", format!("{} is outside [-90, 90]", lat)));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(PosterError::invalid("longitude", format!("{} is outside [-180, 180]", lon)));
        }
        Ok(Self { lat, lon })
    }

    /// Parse a pair of user-supplied coordinate strings.
    pub fn parse(lat: &str, lon: &str) -> PosterResult<Self> {
        let lat = parse_coordinate(lat).map_err(|e| PosterError::invalid("latitude", e))?;
        let lon = parse_coordinate(lon).map_err(|e| PosterError::invalid("longitude", e))?;
        Self::validated(lat, lon)
    }

    /// Poster label form, e.g. `48.8566° N / 2.3522° E`.
    pub fn poster_label(&self) -> String {
        let ns = if self.lat < 0.0 { 'S' } else { 'N' };
        let ew = if self.lon < 0.0 { 'W' } else { 'E' };
        format!(
            "{:.4}° {} / {:.4}° {}",
            self.lat.abs(),
            ns,
            self.lon.abs(),
            ew
        )
    }
}

impl fmt::Display for LatLon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.lat, self.lon)
    }
}

/// Parse a single coordinate in decimal or degrees/minutes/seconds form.
///
/// Accepted: `48.8566`, `-73.98`, `40.7N`, `S 33.86`, `40°46'36"N`,
/// `40 46 36.5 W`, `2°21′7.9″E`. A hemisphere letter S or W negates the value.
pub fn parse_coordinate(input: &str) -> Result<f64, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err("empty coordinate".to_string());
    }

    let mut hemisphere_sign = 1.0;
    let mut hemisphere_seen = false;
    let mut numeric = String::with_capacity(trimmed.len());

    for ch in trimmed.chars() {
        match ch.to_ascii_uppercase() {
            'N' | 'E' | 'S' | 'W' if hemisphere_seen => {
                return Err(format!("more than one hemisphere letter in '{}'", input));
            }
            'N' | 'E' => hemisphere_seen = true,
            'S' | 'W' => {
                hemisphere_seen = true;
                hemisphere_sign = -1.0;
            }
            c if c.is_ascii_digit() || c == '.' || c == '-' || c == '+' => numeric.push(c),
            _ => numeric.push(' '),
        }
    }

    let parts: Vec<&str> = numeric.split_whitespace().collect();
    if parts.is_empty() || parts.len() > 3 {
        return Err(format!("cannot parse coordinate '{}'", input));
    }

    let mut values = Vec::with_capacity(parts.len());
    for part in &parts {
        let value: f64 = part
            .parse()
            .map_err(|_| format!("invalid number '{}' in '{}'", part, input))?;
        values.push(value);
    }

    let negative = values[0].is_sign_negative();
    let degrees = values[0].abs();
    let minutes = values.get(1).copied().unwrap_or(0.0);
    let seconds = values.get(2).copied().unwrap_or(0.0);

    if !(0.0..60.0).contains(&minutes) || !(0.0..60.0).contains(&seconds) {
        return Err(format!("minutes and seconds must be in [0, 60) in '{}'", input));
    }

    let magnitude = degrees + minutes / 60.0 + seconds / 3600.0;
    let sign = if negative { -1.0 } else { 1.0 } * hemisphere_sign;
    if negative && hemisphere_sign < 0.0 {
        return Err(format!("conflicting sign and hemisphere in '{}'", input));
    }

    Ok(sign * magnitude)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_parse_decimal() {
        assert!(approx(parse_coordinate("48.8566").unwrap(), 48.8566));
        assert!(approx(parse_coordinate(" -73.9857 ").unwrap(), -73.9857));
    }

    #[test]
    fn test_parse_hemisphere_letters() {
        assert!(approx(parse_coordinate("40.7N").unwrap(), 40.7));
        assert!(approx(parse_coordinate("S 33.86").unwrap(), -33.86));
        assert!(approx(parse_coordinate("151.2 e").unwrap(), 151.2));
    }

    #[test]
    fn test_parse_dms() {
        let v = parse_coordinate("40°46'36\"N").unwrap();
        assert!(approx(v, 40.0 + 46.0 / 60.0 + 36.0 / 3600.0));

        let v = parse_coordinate("73 58 30 W").unwrap();
        assert!(approx(v, -(73.0 + 58.0 / 60.0 + 30.0 / 3600.0)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_coordinate("").is_err());
        assert!(parse_coordinate("north").is_err());
        assert!(parse_coordinate("40 70 0").is_err());
        assert!(parse_coordinate("-40 S").is_err());
        assert!(parse_coordinate("1 2 3 4").is_err());
    }

    #[test]
    fn test_validated_ranges() {
        assert!(LatLon::validated(91.0, 0.0).is_err());
        assert!(LatLon::validated(0.0, -181.0).is_err());
        assert!(LatLon::validated(f64::NAN, 0.0).is_err());
        assert!(LatLon::validated(-33.86, 151.2).is_ok());
    }

    #[test]
    fn test_poster_label_hemispheres() {
        assert_eq!(
            LatLon::new(48.8566, 2.3522).poster_label(),
            "48.8566° N / 2.3522° E"
        );
        assert_eq!(
            LatLon::new(-33.8688, -70.6693).poster_label(),
            "33.8688° S / 70.6693° W"
        );
    }
}
