//! Poster requests, output formats and naming.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{PosterError, PosterResult};
use crate::point::LatLon;

/// Largest accepted poster side, in inches.
pub const MAX_DIMENSION_INCHES: f64 = 20.0;

/// Default poster size, in inches.
pub const DEFAULT_WIDTH_INCHES: f64 = 12.0;
pub const DEFAULT_HEIGHT_INCHES: f64 = 16.0;

/// Default map radius in meters.
pub const DEFAULT_DISTANCE_M: f64 = 18_000.0;

/// Fraction of the page covered by each gradient fade.
pub const DEFAULT_GRADIENT_HEIGHT: f64 = 0.25;

// ============================================================================
// Output format
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    Svg,
    Pdf,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Svg => "svg",
            OutputFormat::Pdf => "pdf",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Svg => "image/svg+xml",
            OutputFormat::Pdf => "application/pdf",
        }
    }

    /// Guess the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()?.to_str()?.parse().ok()
    }
}

impl FromStr for OutputFormat {
    type Err = PosterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "svg" => Ok(OutputFormat::Svg),
            "pdf" => Ok(OutputFormat::Pdf),
            other => Err(PosterError::invalid(
                "format",
                format!("'{}' is not one of png, svg, pdf", other),
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

// ============================================================================
// Output naming
// ============================================================================

/// Timestamp granularity for generated file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputNaming {
    /// `%Y%m%d_%H%M%S`, for sequential generation.
    #[default]
    Seconds,
    /// Adds microseconds so concurrent workers never collide.
    Micros,
}

/// Lowercased city name with spaces as underscores and commas dropped. Path
/// separators and parent references never survive.
pub fn city_slug(city: &str) -> String {
    let slug = file_component(&city.to_lowercase().replace(',', ""));
    if slug.is_empty() {
        "poster".to_string()
    } else {
        slug
    }
}

/// Words of `s` joined by `_`, split on whitespace, path separators and
/// control characters. Dot runs collapse to one dot and dot-only words are
/// dropped, so the result is a single plain file name component.
fn file_component(s: &str) -> String {
    s.split(|c: char| c.is_whitespace() || c == '/' || c == '\\' || c.is_control())
        .map(|word| {
            let mut out = String::with_capacity(word.len());
            for c in word.chars() {
                if !(c == '.' && out.ends_with('.')) {
                    out.push(c);
                }
            }
            out
        })
        .filter(|word| !word.is_empty() && word != ".")
        .collect::<Vec<_>>()
        .join("_")
}

/// `{city_slug}_{theme}_{distance}m_{timestamp}.{ext}`
pub fn output_filename(
    city: &str,
    theme: &str,
    distance_m: f64,
    format: OutputFormat,
    naming: OutputNaming,
    now: DateTime<Utc>,
) -> String {
    let timestamp = match naming {
        OutputNaming::Seconds => now.format("%Y%m%d_%H%M%S").to_string(),
        OutputNaming::Micros => now.format("%Y%m%d_%H%M%S_%6f").to_string(),
    };
    format!(
        "{}_{}_{}m_{}.{}",
        city_slug(city),
        file_component(theme),
        distance_m.round() as i64,
        timestamp,
        format.extension()
    )
}

// ============================================================================
// Presets
// ============================================================================

/// Named map radii.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistancePreset {
    Ville,
    Town,
    City,
    Metro,
    Region,
}

impl DistancePreset {
    pub fn meters(&self) -> f64 {
        match self {
            DistancePreset::Ville => 5_000.0,
            DistancePreset::Town => 8_000.0,
            DistancePreset::City => 12_000.0,
            DistancePreset::Metro => 18_000.0,
            DistancePreset::Region => 25_000.0,
        }
    }

    pub fn all() -> &'static [DistancePreset] {
        &[
            DistancePreset::Ville,
            DistancePreset::Town,
            DistancePreset::City,
            DistancePreset::Metro,
            DistancePreset::Region,
        ]
    }
}

impl FromStr for DistancePreset {
    type Err = PosterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ville" => Ok(DistancePreset::Ville),
            "town" => Ok(DistancePreset::Town),
            "city" => Ok(DistancePreset::City),
            "metro" => Ok(DistancePreset::Metro),
            "region" => Ok(DistancePreset::Region),
            other => Err(PosterError::invalid(
                "preset",
                format!("'{}' is not one of ville, town, city, metro, region", other),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaperOrientation {
    #[default]
    Portrait,
    Landscape,
}

/// Paper sizes offered by the web interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaperFormat {
    A3,
    A4,
    A5,
    Ultrawide,
    Square,
    Poster,
}

impl PaperFormat {
    pub fn all() -> &'static [PaperFormat] {
        &[
            PaperFormat::A3,
            PaperFormat::A4,
            PaperFormat::A5,
            PaperFormat::Ultrawide,
            PaperFormat::Square,
            PaperFormat::Poster,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            PaperFormat::A3 => "A3 (29.7 x 42 cm)",
            PaperFormat::A4 => "A4 (21 x 29.7 cm)",
            PaperFormat::A5 => "A5 (14.8 x 21 cm)",
            PaperFormat::Ultrawide => "Ultrawide (11.47 x 4.8 in)",
            PaperFormat::Square => "Square (12 x 12 in)",
            PaperFormat::Poster => "Poster (18 x 24 in)",
        }
    }

    /// Portrait (width, height) in inches.
    pub fn inches(&self) -> (f64, f64) {
        match self {
            PaperFormat::A3 => (11.7, 16.5),
            PaperFormat::A4 => (8.3, 11.7),
            PaperFormat::A5 => (5.8, 8.3),
            PaperFormat::Ultrawide => (11.47, 4.8),
            PaperFormat::Square => (12.0, 12.0),
            PaperFormat::Poster => (18.0, 24.0),
        }
    }

    /// Dimensions for the orientation; landscape swaps width and height.
    pub fn dimensions(&self, orientation: PaperOrientation) -> (f64, f64) {
        let (w, h) = self.inches();
        match orientation {
            PaperOrientation::Portrait => (w, h),
            PaperOrientation::Landscape => (h, w),
        }
    }
}

impl FromStr for PaperFormat {
    type Err = PosterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "a3" => Ok(PaperFormat::A3),
            "a4" => Ok(PaperFormat::A4),
            "a5" => Ok(PaperFormat::A5),
            "ultrawide" => Ok(PaperFormat::Ultrawide),
            "square" => Ok(PaperFormat::Square),
            "poster" => Ok(PaperFormat::Poster),
            other => Err(PosterError::invalid(
                "format_preset",
                format!("'{}' is not a known paper format", other),
            )),
        }
    }
}

impl FromStr for PaperOrientation {
    type Err = PosterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "portrait" => Ok(PaperOrientation::Portrait),
            "landscape" => Ok(PaperOrientation::Landscape),
            other => Err(PosterError::invalid(
                "orientation",
                format!("'{}' is not portrait or landscape", other),
            )),
        }
    }
}

// ============================================================================
// Poster request
// ============================================================================

/// Everything that determines one rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PosterRequest {
    pub city: String,
    pub country: String,
    /// Country text shown instead of `country`.
    #[serde(default)]
    pub country_label: Option<String>,
    /// City text shown instead of `city`; wins over every other label.
    #[serde(default)]
    pub display_city: Option<String>,
    /// Country text shown instead of `country_label`.
    #[serde(default)]
    pub display_country: Option<String>,
    pub center: LatLon,
    pub distance_m: f64,
    pub width_in: f64,
    pub height_in: f64,
    pub format: OutputFormat,
    pub output_path: PathBuf,
    pub gradient_height: f64,
}

impl PosterRequest {
    pub fn new(city: impl Into<String>, country: impl Into<String>, center: LatLon) -> Self {
        Self {
            city: city.into(),
            country: country.into(),
            country_label: None,
            display_city: None,
            display_country: None,
            center,
            distance_m: DEFAULT_DISTANCE_M,
            width_in: DEFAULT_WIDTH_INCHES,
            height_in: DEFAULT_HEIGHT_INCHES,
            format: OutputFormat::Png,
            output_path: PathBuf::new(),
            gradient_height: DEFAULT_GRADIENT_HEIGHT,
        }
    }

    /// Fetch radius inflated so the aspect-ratio crop never shows unfetched
    /// area. Fetching and cropping both use this value.
    pub fn compensated_distance(&self) -> f64 {
        compensated_distance(self.distance_m, self.width_in, self.height_in)
    }

    pub fn display_city(&self) -> &str {
        self.display_city
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&self.city)
    }

    pub fn display_country(&self) -> &str {
        self.display_country
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| self.country_label.as_deref().filter(|s| !s.trim().is_empty()))
            .unwrap_or(&self.country)
    }

    /// Check ranges that would make the rendering meaningless.
    pub fn validate(&self) -> PosterResult<()> {
        if self.city.trim().is_empty() {
            return Err(PosterError::MissingParameter("city".into()));
        }
        if self.country.trim().is_empty() {
            return Err(PosterError::MissingParameter("country".into()));
        }
        if !(self.distance_m.is_finite() && self.distance_m > 0.0) {
            return Err(PosterError::invalid("distance", "must be a positive number of meters"));
        }
        for (name, value) in [("width", self.width_in), ("height", self.height_in)] {
            if !(value.is_finite() && value > 0.0 && value <= MAX_DIMENSION_INCHES) {
                return Err(PosterError::invalid(
                    name,
                    format!("must be in (0, {}] inches", MAX_DIMENSION_INCHES),
                ));
            }
        }
        if !(0.0..=0.5).contains(&self.gradient_height) {
            return Err(PosterError::invalid("gradient_height", "must be in [0, 0.5]"));
        }
        Ok(())
    }
}

/// `dist * max(w, h) / min(w, h) / 4`
pub fn compensated_distance(distance_m: f64, width: f64, height: f64) -> f64 {
    distance_m * (width.max(height) / width.min(height)) / 4.0
}

/// Cap a poster side at the maximum, reporting whether it was clamped.
pub fn clamp_dimension(value: f64) -> (f64, bool) {
    if value > MAX_DIMENSION_INCHES {
        (MAX_DIMENSION_INCHES, true)
    } else {
        (value, false)
    }
}
