//! Theme colors.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An opaque sRGB color, serialized as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Hex form used in SVG attributes.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = String;

    /// Accepts `#RRGGBB` and the `#RGB` shorthand.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .trim()
            .strip_prefix('#')
            .ok_or_else(|| format!("color '{}' must start with '#'", s))?;
        if !hex.is_ascii() {
            return Err(format!("invalid hex digits in color '{}'", s));
        }

        let channel = |h: &str| {
            u8::from_str_radix(h, 16).map_err(|_| format!("invalid hex digits in color '{}'", s))
        };

        match hex.len() {
            6 => Ok(Color::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => {
                let expand = |h: &str| channel(&h.repeat(2));
                Ok(Color::rgb(
                    expand(&hex[0..1])?,
                    expand(&hex[1..2])?,
                    expand(&hex[2..3])?,
                ))
            }
            _ => Err(format!("color '{}' must be #RRGGBB or #RGB", s)),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_hex() {
        let c: Color = "#F5EDE4".parse().unwrap();
        assert_eq!(c, Color::rgb(0xF5, 0xED, 0xE4));
        assert_eq!(c.to_hex(), "#f5ede4");
    }

    #[test]
    fn test_parse_short_hex() {
        let c: Color = "#fa0".parse().unwrap();
        assert_eq!(c, Color::rgb(0xFF, 0xAA, 0x00));
    }

    #[test]
    fn test_reject_invalid() {
        assert!("F5EDE4".parse::<Color>().is_err());
        assert!("#GGGGGG".parse::<Color>().is_err());
        assert!("#12345".parse::<Color>().is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let c: Color = serde_json::from_str("\"#000000\"").unwrap();
        assert_eq!(c, Color::rgb(0, 0, 0));
        assert_eq!(serde_json::to_string(&c).unwrap(), "\"#000000\"");
    }
}
