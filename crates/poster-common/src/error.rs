//! Error types for city-poster crates and services.

use thiserror::Error;

/// Result type alias using PosterError.
pub type PosterResult<T> = Result<T, PosterError>;

/// Primary error type for poster generation.
#[derive(Debug, Error)]
pub enum PosterError {
    // === Cache Errors ===
    #[error("Cache read failed for '{key}': {message}")]
    CacheRead { key: String, message: String },

    #[error("Cache write failed for '{key}': {message}")]
    CacheWrite { key: String, message: String },

    // === Geocoding Errors ===
    #[error("Geocoding request failed for '{query}': {message}")]
    Geocoding { query: String, message: String },

    #[error("Could not find coordinates for {0}")]
    LocationNotFound(String),

    // === Data Fetch Errors ===
    #[error("Failed to fetch {layer}: {message}")]
    DataFetch { layer: String, message: String },

    #[error("No street network data returned for this area")]
    EmptyNetwork,

    // === Validation Errors ===
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    #[error("Theme not found: {0}")]
    ThemeNotFound(String),

    #[error("Invalid theme '{name}': {message}")]
    InvalidTheme { name: String, message: String },

    #[error("No themes found in '{0}'")]
    NoThemes(String),

    // === Rendering Errors ===
    #[error("Rendering failed: {0}")]
    RenderError(String),

    #[error("Projection error: {0}")]
    ProjectionError(String),

    // === Infrastructure Errors ===
    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Generation cancelled")]
    Cancelled,
}

impl PosterError {
    /// Shorthand for a layer fetch failure.
    pub fn fetch(layer: impl Into<String>, message: impl ToString) -> Self {
        PosterError::DataFetch {
            layer: layer.into(),
            message: message.to_string(),
        }
    }

    /// Shorthand for an invalid parameter.
    pub fn invalid(param: impl Into<String>, message: impl ToString) -> Self {
        PosterError::InvalidParameter {
            param: param.into(),
            message: message.to_string(),
        }
    }

    /// Errors caused by user input. These end the CLI with exit code 1 and a
    /// remediation hint rather than a trace.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            PosterError::MissingParameter(_)
                | PosterError::InvalidParameter { .. }
                | PosterError::ThemeNotFound(_)
                | PosterError::InvalidTheme { .. }
                | PosterError::NoThemes(_)
        )
    }

    /// Cache errors are split by direction: reads are fatal, writes are not.
    pub fn is_cache(&self) -> bool {
        matches!(
            self,
            PosterError::CacheRead { .. } | PosterError::CacheWrite { .. }
        )
    }

    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            PosterError::MissingParameter(_)
            | PosterError::InvalidParameter { .. }
            | PosterError::InvalidTheme { .. } => 400,

            PosterError::ThemeNotFound(_) | PosterError::LocationNotFound(_) => 404,

            PosterError::Cancelled => 409,

            PosterError::Geocoding { .. } | PosterError::DataFetch { .. } => 502,

            _ => 500,
        }
    }

    /// Remediation text shown next to validation failures.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            PosterError::MissingParameter(_) => {
                Some("Both --city and --country are required (or --list-themes).")
            }
            PosterError::ThemeNotFound(_) => Some("Run with --list-themes to see available themes."),
            PosterError::NoThemes(_) => {
                Some("Add theme JSON files to the themes directory or set THEMES_DIR.")
            }
            PosterError::LocationNotFound(_) => {
                Some("Check the spelling or pass --latitude and --longitude explicitly.")
            }
            _ => None,
        }
    }
}

// Conversion from common error types
impl From<std::io::Error> for PosterError {
    fn from(err: std::io::Error) -> Self {
        PosterError::InternalError(err.to_string())
    }
}

impl From<serde_json::Error> for PosterError {
    fn from(err: serde_json::Error) -> Self {
        PosterError::InternalError(format!("JSON error: {}", err))
    }
}
