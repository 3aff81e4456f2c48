//! Data source traits.
//!
//! The compositor only sees these traits, so network clients, the caching
//! wrapper and test fakes are interchangeable.

use async_trait::async_trait;

use poster_common::{LatLon, PosterResult};

use crate::geocode::ReverseGeocode;
use crate::model::{FeatureCollection, StreetNetwork};
use crate::tags::LayerKind;

/// Resolves place names to coordinates and back.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Coordinates for `"{city}, {country}"`.
    async fn geocode(&self, city: &str, country: &str) -> PosterResult<LatLon>;

    /// Place names for a point, in `language`.
    async fn reverse(&self, center: LatLon, language: &str) -> PosterResult<ReverseGeocode>;
}

/// Supplies the vector layers of a poster.
#[async_trait]
pub trait MapDataSource: Send + Sync {
    /// Street network within `dist` meters of `center`.
    async fn street_network(&self, center: LatLon, dist: f64) -> PosterResult<StreetNetwork>;

    /// Features of one layer within `dist` meters of `center`.
    async fn features(
        &self,
        center: LatLon,
        dist: f64,
        layer: LayerKind,
    ) -> PosterResult<FeatureCollection>;
}
