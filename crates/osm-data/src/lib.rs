//! OpenStreetMap data access for poster generation.
//!
//! Provides:
//! - Overpass queries for the street network and tagged feature layers
//! - Nominatim forward and reverse geocoding with self-throttling
//! - A cache-wrapping data source over the content cache
//!
//! Tag values are normalized to a single value when responses are parsed,
//! so styling code never sees multi-valued tags.

pub mod assemble;
pub mod cached;
pub mod geocode;
pub mod model;
pub mod overpass;
pub mod source;
pub mod tags;

pub use cached::CachedSource;
pub use geocode::{NominatimClient, ReverseGeocode};
pub use model::{Feature, FeatureCollection, StreetEdge, StreetNetwork, Tags};
pub use overpass::OverpassClient;
pub use source::{Geocoder, MapDataSource};
pub use tags::{LayerKind, TagFilter, TagMatch, TagQuery};
