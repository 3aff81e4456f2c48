//! Common types and utilities shared across all city-poster crates and services.

pub mod bbox;
pub mod color;
pub mod config;
pub mod error;
pub mod point;
pub mod request;
pub mod theme;

pub use bbox::BoundingBox;
pub use color::Color;
pub use config::PosterSettings;
pub use error::{PosterError, PosterResult};
pub use point::LatLon;
pub use request::{
    DistancePreset, OutputFormat, OutputNaming, PaperFormat, PaperOrientation, PosterRequest,
};
pub use theme::{Theme, ThemeCatalog, DEFAULT_THEME};
