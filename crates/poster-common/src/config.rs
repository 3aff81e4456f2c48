//! Runtime settings shared by the CLI and the web service.
//!
//! Settings come from built-in defaults, then an optional YAML file, then
//! environment variables (`CACHE_DIR`, `THEMES_DIR`, `POSTERS_DIR`,
//! `LAND_POLYGONS_PATH`, `OVERPASS_URL`, `NOMINATIM_URL`).

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{PosterError, PosterResult};

// ============================================================================
// Settings
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PosterSettings {
    pub cache_dir: PathBuf,
    pub themes_dir: PathBuf,
    pub posters_dir: PathBuf,
    pub land_polygons_path: PathBuf,
    pub overpass_url: String,
    pub nominatim_url: String,
    pub user_agent: String,
    /// Overpass request timeout; large radii can take minutes.
    pub fetch_timeout_secs: u64,
    pub geocode_timeout_secs: u64,
    /// Minimum spacing between geocoding calls.
    pub geocode_interval_ms: u64,
    pub font_family: String,
    pub font_dir: Option<PathBuf>,
    pub dpi: u32,
    pub workers: usize,
    /// Cached entries older than this are treated as misses. Unset means
    /// entries never expire.
    pub cache_ttl_hours: Option<u64>,
}

impl Default for PosterSettings {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("cache"),
            themes_dir: PathBuf::from("themes"),
            posters_dir: PathBuf::from("posters"),
            land_polygons_path: PathBuf::from(
                "data/land_polygons/land-polygons-split-4326/land_polygons.shp",
            ),
            overpass_url: "https://overpass-api.de/api/interpreter".to_string(),
            nominatim_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: "city_map_poster".to_string(),
            fetch_timeout_secs: 180,
            geocode_timeout_secs: 10,
            geocode_interval_ms: 1_000,
            font_family: "Roboto".to_string(),
            font_dir: Some(PathBuf::from("fonts")),
            dpi: 300,
            workers: 4,
            cache_ttl_hours: None,
        }
    }
}

impl PosterSettings {
    /// Defaults, overlaid with the YAML file at `path` (if any), overlaid with
    /// environment variables.
    pub fn load(path: Option<&Path>) -> PosterResult<Self> {
        let mut settings = match path {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        settings.apply_env();
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_yaml_file(path: &Path) -> PosterResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PosterError::invalid("config", format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
            .map_err(|e| PosterError::invalid("config", format!("{}: {}", path.display(), e)))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    fn apply_env(&mut self) {
        if let Ok(v) = env::var("CACHE_DIR") {
            self.cache_dir = PathBuf::from(v);
        }
        if let Ok(v) = env::var("THEMES_DIR") {
            self.themes_dir = PathBuf::from(v);
        }
        if let Ok(v) = env::var("POSTERS_DIR") {
            self.posters_dir = PathBuf::from(v);
        }
        if let Ok(v) = env::var("LAND_POLYGONS_PATH") {
            self.land_polygons_path = PathBuf::from(v);
        }
        if let Ok(v) = env::var("OVERPASS_URL") {
            self.overpass_url = v;
        }
        if let Ok(v) = env::var("NOMINATIM_URL") {
            self.nominatim_url = v;
        }
    }

    fn validate(&self) -> PosterResult<()> {
        if self.dpi == 0 {
            return Err(PosterError::invalid("dpi", "must be positive"));
        }
        if self.workers == 0 {
            return Err(PosterError::invalid("workers", "must be at least 1"));
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl_hours.map(|h| Duration::from_secs(h * 3600))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn geocode_timeout(&self) -> Duration {
        Duration::from_secs(self.geocode_timeout_secs)
    }

    pub fn geocode_interval(&self) -> Duration {
        Duration::from_millis(self.geocode_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let settings = PosterSettings::from_yaml_str("dpi: 150\ncache_ttl_hours: 24\n").unwrap();
        assert_eq!(settings.dpi, 150);
        assert_eq!(settings.cache_ttl(), Some(Duration::from_secs(86_400)));
        assert_eq!(settings.themes_dir, PathBuf::from("themes"));
        assert_eq!(settings.user_agent, "city_map_poster");
    }

    #[test]
    fn test_default_never_expires() {
        assert!(PosterSettings::default().cache_ttl().is_none());
    }

    #[test]
    fn test_missing_file_is_validation_error() {
        let err = PosterSettings::from_yaml_file(Path::new("/nonexistent/poster.yaml")).unwrap_err();
        assert!(err.is_validation());
    }
}
