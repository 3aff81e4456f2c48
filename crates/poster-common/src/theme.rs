//! Poster color themes.
//!
//! A theme maps a fixed set of roles (background, text, water, parks, five
//! road classes, gradient, optional buildings) to colors. Theme files live in
//! a themes directory as one JSON object per file; any role a file omits is
//! taken from the built-in terracotta palette.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::color::Color;
use crate::error::{PosterError, PosterResult};

/// Identifier of the built-in theme.
pub const DEFAULT_THEME: &str = "terracotta";

/// A fully resolved theme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub bg: Color,
    pub text: Color,
    pub gradient_color: Color,
    pub water: Color,
    pub parks: Color,
    pub road_motorway: Color,
    pub road_primary: Color,
    pub road_secondary: Color,
    pub road_tertiary: Color,
    pub road_residential: Color,
    pub road_default: Color,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buildings: Option<Color>,
}

impl Default for Theme {
    fn default() -> Self {
        Self::terracotta()
    }
}

impl Theme {
    /// Built-in fallback palette.
    pub fn terracotta() -> Self {
        Self {
            name: "Terracotta".to_string(),
            description: Some(
                "Mediterranean warmth - burnt orange and clay tones on cream".to_string(),
            ),
            bg: Color::rgb(0xF5, 0xED, 0xE4),
            text: Color::rgb(0x8B, 0x45, 0x13),
            gradient_color: Color::rgb(0xF5, 0xED, 0xE4),
            water: Color::rgb(0xA8, 0xC4, 0xC4),
            parks: Color::rgb(0xE8, 0xE0, 0xD0),
            road_motorway: Color::rgb(0xA0, 0x52, 0x2D),
            road_primary: Color::rgb(0xB8, 0x65, 0x3A),
            road_secondary: Color::rgb(0xC9, 0x84, 0x6A),
            road_tertiary: Color::rgb(0xD9, 0xA0, 0x8A),
            road_residential: Color::rgb(0xE5, 0xC4, 0xB0),
            road_default: Color::rgb(0xD9, 0xA0, 0x8A),
            buildings: None,
        }
    }

    /// Building fill, falling back to the background color.
    pub fn buildings_color(&self) -> Color {
        self.buildings.unwrap_or(self.bg)
    }

    /// Parse a theme document, filling omitted roles from the default palette.
    pub fn from_json(id: &str, json: &str) -> PosterResult<Self> {
        let file: ThemeFile = serde_json::from_str(json).map_err(|e| PosterError::InvalidTheme {
            name: id.to_string(),
            message: e.to_string(),
        })?;
        Ok(file.resolve(id))
    }
}

/// On-disk theme shape; every role is optional.
#[derive(Debug, Default, Deserialize)]
struct ThemeFile {
    name: Option<String>,
    description: Option<String>,
    bg: Option<Color>,
    text: Option<Color>,
    gradient_color: Option<Color>,
    water: Option<Color>,
    parks: Option<Color>,
    road_motorway: Option<Color>,
    road_primary: Option<Color>,
    road_secondary: Option<Color>,
    road_tertiary: Option<Color>,
    road_residential: Option<Color>,
    road_default: Option<Color>,
    buildings: Option<Color>,
}

impl ThemeFile {
    fn resolve(self, id: &str) -> Theme {
        let base = Theme::terracotta();
        let mut missing = Vec::new();
        let mut role = |value: Option<Color>, fallback: Color, key: &'static str| {
            value.unwrap_or_else(|| {
                missing.push(key);
                fallback
            })
        };

        let theme = Theme {
            bg: role(self.bg, base.bg, "bg"),
            text: role(self.text, base.text, "text"),
            gradient_color: role(self.gradient_color, base.gradient_color, "gradient_color"),
            water: role(self.water, base.water, "water"),
            parks: role(self.parks, base.parks, "parks"),
            road_motorway: role(self.road_motorway, base.road_motorway, "road_motorway"),
            road_primary: role(self.road_primary, base.road_primary, "road_primary"),
            road_secondary: role(self.road_secondary, base.road_secondary, "road_secondary"),
            road_tertiary: role(self.road_tertiary, base.road_tertiary, "road_tertiary"),
            road_residential: role(
                self.road_residential,
                base.road_residential,
                "road_residential",
            ),
            road_default: role(self.road_default, base.road_default, "road_default"),
            name: self.name.unwrap_or_else(|| id.to_string()),
            description: self.description,
            buildings: self.buildings,
        };

        if !missing.is_empty() {
            warn!(theme = %id, roles = ?missing, "Theme is missing roles, using defaults");
        }
        theme
    }
}

/// Short description used by theme listings.
#[derive(Debug, Clone, Serialize)]
pub struct ThemeSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub bg: Color,
    pub text: Color,
    pub road_primary: Color,
}

/// Directory of theme files with an in-memory memo of parsed themes.
pub struct ThemeCatalog {
    dir: PathBuf,
    memo: RwLock<HashMap<String, Theme>>,
}

impl ThemeCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            memo: RwLock::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Theme identifiers (file stems), sorted.
    pub fn available(&self) -> PosterResult<Vec<String>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in WalkDir::new(&self.dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| PosterError::InternalError(e.to_string()))?;
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|e| e.to_str()) != Some("json")
            {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Load a theme by identifier.
    pub fn load(&self, id: &str) -> PosterResult<Theme> {
        if let Some(theme) = self.memo.read().ok().and_then(|m| m.get(id).cloned()) {
            return Ok(theme);
        }

        let path = self.theme_path(id)?;
        if !path.is_file() {
            return Err(PosterError::ThemeNotFound(id.to_string()));
        }
        let json = std::fs::read_to_string(&path)?;
        let theme = Theme::from_json(id, &json)?;
        debug!(theme = %id, path = %path.display(), "Loaded theme");

        if let Ok(mut memo) = self.memo.write() {
            memo.insert(id.to_string(), theme.clone());
        }
        Ok(theme)
    }

    /// Load a theme, substituting the built-in palette when the file is absent.
    pub fn load_or_default(&self, id: &str) -> PosterResult<Theme> {
        match self.load(id) {
            Err(PosterError::ThemeNotFound(_)) => {
                warn!(theme = %id, "Theme file not found, using built-in terracotta");
                Ok(Theme::terracotta())
            }
            other => other,
        }
    }

    /// Resolve the themes to render, failing when the catalog is empty or a
    /// requested theme does not exist.
    pub fn select(&self, requested: &[String], all: bool) -> PosterResult<Vec<String>> {
        let available = self.available()?;
        if available.is_empty() {
            return Err(PosterError::NoThemes(self.dir.display().to_string()));
        }
        if all {
            return Ok(available);
        }
        for id in requested {
            if !available.contains(id) {
                return Err(PosterError::ThemeNotFound(id.clone()));
            }
        }
        Ok(requested.to_vec())
    }

    /// Listing with names and descriptions. Unreadable files are listed by
    /// identifier alone.
    pub fn summaries(&self) -> PosterResult<Vec<ThemeSummary>> {
        let mut out = Vec::new();
        for id in self.available()? {
            let summary = match self.load(&id) {
                Ok(theme) => ThemeSummary {
                    name: theme.name.clone(),
                    description: theme.description.clone().unwrap_or_default(),
                    bg: theme.bg,
                    text: theme.text,
                    road_primary: theme.road_primary,
                    id,
                },
                Err(e) => {
                    warn!(theme = %id, error = %e, "Skipping unreadable theme details");
                    let base = Theme::terracotta();
                    ThemeSummary {
                        name: id.clone(),
                        description: String::new(),
                        bg: base.bg,
                        text: base.text,
                        road_primary: base.road_primary,
                        id,
                    }
                }
            };
            out.push(summary);
        }
        Ok(out)
    }

    /// Identifiers are file stems of ASCII letters, digits, `_` and `-`.
    pub fn is_valid_id(id: &str) -> bool {
        !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    }

    fn theme_path(&self, id: &str) -> PosterResult<PathBuf> {
        if !Self::is_valid_id(id) {
            return Err(PosterError::ThemeNotFound(id.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", id)))
    }
}
