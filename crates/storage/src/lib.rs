//! Storage for city-poster generation.
//!
//! Provides:
//! - A disk-backed content cache for geocoding results and map data
//! - Deterministic cache key construction
//! - The land polygon reference dataset

pub mod content_cache;
pub mod keys;
pub mod land;

pub use content_cache::{CacheStats, ContentCache, CACHE_FORMAT_VERSION};
pub use keys::CacheKey;
pub use land::LandPolygonStore;
