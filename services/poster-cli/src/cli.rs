//! Command-line arguments and the request they describe.

use clap::Parser;
use std::path::PathBuf;

use poster_common::request::{clamp_dimension, DEFAULT_DISTANCE_M};
use poster_common::{
    DistancePreset, LatLon, OutputFormat, PosterError, PosterRequest, PosterResult, DEFAULT_THEME,
};

/// Preview page size in inches.
const PREVIEW_SIZE: (f64, f64) = (3.0, 4.0);

#[derive(Parser, Debug)]
#[command(name = "poster-cli")]
#[command(about = "Generate minimalist map posters for any city")]
pub struct Args {
    /// City name
    #[arg(short = 'c', long)]
    pub city: Option<String>,

    /// Country name
    #[arg(short = 'C', long)]
    pub country: Option<String>,

    /// Center latitude, decimal or DMS (e.g. 40°46'36"N); skips geocoding
    #[arg(long, allow_hyphen_values = true, requires = "longitude")]
    pub latitude: Option<String>,

    /// Center longitude, decimal or DMS
    #[arg(long, allow_hyphen_values = true, requires = "latitude")]
    pub longitude: Option<String>,

    /// Country text shown on the poster
    #[arg(long)]
    pub country_label: Option<String>,

    /// City text shown on the poster, e.g. in another script
    #[arg(long)]
    pub display_city: Option<String>,

    /// Country text shown on the poster, wins over --country-label
    #[arg(long)]
    pub display_country: Option<String>,

    /// Theme name
    #[arg(short = 't', long, default_value = DEFAULT_THEME)]
    pub theme: String,

    /// Render every available theme
    #[arg(long)]
    pub all_themes: bool,

    /// Map radius in meters
    #[arg(short = 'd', long, conflicts_with = "preset")]
    pub distance: Option<f64>,

    /// Named radius: ville, town, city, metro, region
    #[arg(long)]
    pub preset: Option<DistancePreset>,

    /// Poster width in inches (max 20)
    #[arg(short = 'W', long, default_value_t = 12.0)]
    pub width: f64,

    /// Poster height in inches (max 20)
    #[arg(short = 'H', long, default_value_t = 16.0)]
    pub height: f64,

    /// Output format: png, svg or pdf
    #[arg(short = 'f', long, default_value = "png")]
    pub format: OutputFormat,

    /// Quick 3x4 inch PNG draft
    #[arg(long)]
    pub preview: bool,

    /// Parallel workers for --all-themes
    #[arg(long)]
    pub workers: Option<usize>,

    /// List available themes and exit
    #[arg(long)]
    pub list_themes: bool,

    /// Delete every cached response before running
    #[arg(long)]
    pub clear_cache: bool,

    /// YAML settings file
    #[arg(long, env = "POSTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    pub log_level: String,
}

/// A side that was capped at the maximum.
#[derive(Debug, Clone, PartialEq)]
pub struct Clamped {
    pub side: &'static str,
    pub requested: f64,
    pub applied: f64,
}

impl Args {
    pub fn distance_m(&self) -> f64 {
        self.preset
            .map(|p| p.meters())
            .or(self.distance)
            .unwrap_or(DEFAULT_DISTANCE_M)
    }

    /// Poster size after capping, plus the sides that were capped.
    pub fn dimensions(&self) -> ((f64, f64), Vec<Clamped>) {
        if self.preview {
            return (PREVIEW_SIZE, Vec::new());
        }
        let mut clamped = Vec::new();
        let mut side = |name: &'static str, value: f64| {
            let (applied, was_clamped) = clamp_dimension(value);
            if was_clamped {
                clamped.push(Clamped {
                    side: name,
                    requested: value,
                    applied,
                });
            }
            applied
        };
        let width = side("width", self.width);
        let height = side("height", self.height);
        ((width, height), clamped)
    }

    pub fn output_format(&self) -> OutputFormat {
        if self.preview {
            OutputFormat::Png
        } else {
            self.format
        }
    }

    /// Both names, or the error that explains which one is missing.
    pub fn place(&self) -> PosterResult<(&str, &str)> {
        let city = self
            .city
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| PosterError::MissingParameter("--city".into()))?;
        let country = self
            .country
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| PosterError::MissingParameter("--country".into()))?;
        Ok((city, country))
    }

    pub fn coordinates(&self) -> PosterResult<Option<LatLon>> {
        match (&self.latitude, &self.longitude) {
            (Some(lat), Some(lon)) => LatLon::parse(lat, lon).map(Some),
            _ => Ok(None),
        }
    }

    /// Request for `center`; the output path is filled in per theme.
    pub fn request(&self, center: LatLon) -> PosterResult<PosterRequest> {
        let (city, country) = self.place()?;
        let ((width, height), _) = self.dimensions();

        let mut request = PosterRequest::new(city, country, center);
        request.distance_m = self.distance_m();
        request.width_in = width;
        request.height_in = height;
        request.format = self.output_format();
        request.country_label = self.country_label.clone();
        request.display_city = self.display_city.clone();
        request.display_country = self.display_country.clone();
        request.validate()?;
        Ok(request)
    }
}

pub const EXAMPLES: &str = r#"
City Map Poster Generator
=========================

Usage:
  poster-cli --city <city> --country <country> [options]

Examples:
  # Iconic grid patterns
  poster-cli -c "New York" -C "USA" -t noir -d 12000           # Manhattan grid
  poster-cli -c "Barcelona" -C "Spain" -t warm_beige -d 8000   # Eixample district grid

  # Waterfront and canals
  poster-cli -c "Venice" -C "Italy" -t blueprint -d 4000       # Canal network
  poster-cli -c "Amsterdam" -C "Netherlands" -t ocean -d 6000  # Concentric canals

  # Radial patterns
  poster-cli -c "Paris" -C "France" -t pastel_dream -d 10000   # Haussmann boulevards
  poster-cli -c "Moscow" -C "Russia" -t noir -d 12000          # Ring roads

  # Organic old cities
  poster-cli -c "Tokyo" -C "Japan" -t japanese_ink -d 15000 --display-city "東京"
  poster-cli -c "Marrakech" -C "Morocco" -t terracotta --preset ville

  # Explicit coordinates, every theme, four workers
  poster-cli -c "Lauris" -C "France" --latitude 43.7833 --longitude 5.3167 --all-themes --workers 4

  # Quick draft
  poster-cli -c "Rome" -C "Italy" --preview

  # List themes
  poster-cli --list-themes

Distance guide:
  4000-6000m   Small or dense cities (Venice, Amsterdam old center)
  8000-12000m  Medium cities, focused downtown (Paris, Barcelona)
  15000-20000m Large metros, full city view (Tokyo, Mumbai)

Themes are read from the themes directory (THEMES_DIR).
Posters are written to the posters directory (POSTERS_DIR).
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("poster-cli").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["-c", "Paris", "-C", "France"]);
        assert_eq!(args.theme, "terracotta");
        assert_eq!(args.distance_m(), 18_000.0);
        assert_eq!(args.format, OutputFormat::Png);
        assert_eq!(args.dimensions(), ((12.0, 16.0), Vec::new()));
        assert_eq!(args.place().unwrap(), ("Paris", "France"));
    }

    #[test]
    fn test_preset_sets_distance() {
        let args = parse(&["-c", "Paris", "-C", "France", "--preset", "town"]);
        assert_eq!(args.distance_m(), 8_000.0);
        assert!(Args::try_parse_from([
            "poster-cli", "-c", "Paris", "-C", "France", "--preset", "town", "-d", "100"
        ])
        .is_err());
    }

    #[test]
    fn test_dimensions_capped() {
        let args = parse(&["-c", "Paris", "-C", "France", "-W", "30", "-H", "18"]);
        let ((w, h), clamped) = args.dimensions();
        assert_eq!((w, h), (20.0, 18.0));
        assert_eq!(clamped.len(), 1);
        assert_eq!(clamped[0].side, "width");
        assert_eq!(clamped[0].requested, 30.0);
    }

    #[test]
    fn test_preview_forces_small_png() {
        let args = parse(&["-c", "Paris", "-C", "France", "-f", "pdf", "--preview"]);
        let request = args.request(LatLon::new(48.8566, 2.3522)).unwrap();
        assert_eq!((request.width_in, request.height_in), (3.0, 4.0));
        assert_eq!(request.format, OutputFormat::Png);
    }

    #[test]
    fn test_missing_country_is_validation_error() {
        let args = parse(&["-c", "Paris"]);
        let err = args.place().unwrap_err();
        assert!(err.is_validation());
        assert!(err.hint().is_some());
    }

    #[test]
    fn test_dms_coordinates() {
        let args = parse(&[
            "-c", "New York", "-C", "USA", "--latitude", "40°46'36\"N", "--longitude", "-73.9857",
        ]);
        let point = args.coordinates().unwrap().unwrap();
        assert!((point.lat - 40.7767).abs() < 1e-3);
        assert!((point.lon + 73.9857).abs() < 1e-9);
    }

    #[test]
    fn test_display_overrides_carried() {
        let args = parse(&[
            "-c", "Tokyo", "-C", "Japan", "--display-city", "東京", "--country-label", "Nippon",
        ]);
        let request = args.request(LatLon::new(35.6762, 139.6503)).unwrap();
        assert_eq!(request.display_city(), "東京");
        assert_eq!(request.display_country(), "Nippon");
    }
}
