//! In-memory data sources.
//!
//! `FakeSource` answers every layer from a map filled by the test and
//! counts calls, so tests can assert whether the network was touched.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use osm_data::{FeatureCollection, Geocoder, LayerKind, MapDataSource, ReverseGeocode, StreetNetwork};
use poster_common::{LatLon, PosterError, PosterResult};

#[derive(Default)]
pub struct FakeSource {
    network: StreetNetwork,
    layers: HashMap<LayerKind, FeatureCollection>,
    failing: HashSet<LayerKind>,
    places: HashMap<String, LatLon>,
    network_calls: AtomicUsize,
    feature_calls: AtomicUsize,
    geocode_calls: AtomicUsize,
}

impl FakeSource {
    pub fn new(network: StreetNetwork) -> Self {
        Self {
            network,
            ..Default::default()
        }
    }

    pub fn with_layer(mut self, kind: LayerKind, collection: FeatureCollection) -> Self {
        self.layers.insert(kind, collection);
        self
    }

    /// Make one layer fail with a fetch error.
    pub fn failing(mut self, kind: LayerKind) -> Self {
        self.failing.insert(kind);
        self
    }

    pub fn with_place(mut self, city: &str, country: &str, point: LatLon) -> Self {
        self.places.insert(place_key(city, country), point);
        self
    }

    pub fn network_calls(&self) -> usize {
        self.network_calls.load(Ordering::SeqCst)
    }

    pub fn feature_calls(&self) -> usize {
        self.feature_calls.load(Ordering::SeqCst)
    }

    pub fn geocode_calls(&self) -> usize {
        self.geocode_calls.load(Ordering::SeqCst)
    }

    /// Every call of any kind.
    pub fn total_calls(&self) -> usize {
        self.network_calls() + self.feature_calls() + self.geocode_calls()
    }
}

fn place_key(city: &str, country: &str) -> String {
    format!("{}, {}", city.to_lowercase(), country.to_lowercase())
}

#[async_trait]
impl MapDataSource for FakeSource {
    async fn street_network(&self, _center: LatLon, _dist: f64) -> PosterResult<StreetNetwork> {
        self.network_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.network.clone())
    }

    async fn features(
        &self,
        _center: LatLon,
        _dist: f64,
        layer: LayerKind,
    ) -> PosterResult<FeatureCollection> {
        self.feature_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&layer) {
            return Err(PosterError::fetch(layer.name(), "simulated outage"));
        }
        Ok(self
            .layers
            .get(&layer)
            .cloned()
            .unwrap_or_else(|| FeatureCollection::empty(layer.name())))
    }
}

#[async_trait]
impl Geocoder for FakeSource {
    async fn geocode(&self, city: &str, country: &str) -> PosterResult<LatLon> {
        self.geocode_calls.fetch_add(1, Ordering::SeqCst);
        self.places
            .get(&place_key(city, country))
            .copied()
            .ok_or_else(|| PosterError::LocationNotFound(format!("{}, {}", city, country)))
    }

    async fn reverse(&self, center: LatLon, _language: &str) -> PosterResult<ReverseGeocode> {
        self.geocode_calls.fetch_add(1, Ordering::SeqCst);
        self.places
            .iter()
            .find(|(_, p)| **p == center)
            .map(|(key, _)| {
                let (city, country) = key.split_once(", ").unwrap_or((key.as_str(), ""));
                ReverseGeocode {
                    city: city.to_string(),
                    country: country.to_string(),
                    full_address: key.clone(),
                }
            })
            .ok_or_else(|| PosterError::LocationNotFound(center.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{places, street_network};

    #[tokio::test]
    async fn test_missing_layers_are_empty() {
        let source = FakeSource::new(street_network(places::LAURIS));
        let parks = source.features(places::LAURIS, 1000.0, LayerKind::Parks).await.unwrap();
        assert!(parks.is_empty());
        assert_eq!(source.feature_calls(), 1);
    }

    #[tokio::test]
    async fn test_failing_layer() {
        let source = FakeSource::new(StreetNetwork::default()).failing(LayerKind::Water);
        assert!(source.features(places::LAURIS, 1000.0, LayerKind::Water).await.is_err());
    }

    #[tokio::test]
    async fn test_geocode_is_case_insensitive() {
        let source = FakeSource::default().with_place("Lauris", "France", places::LAURIS);
        let point = source.geocode("LAURIS", "france").await.unwrap();
        assert_eq!(point, places::LAURIS);
        assert!(source.geocode("Paris", "France").await.is_err());
    }
}
