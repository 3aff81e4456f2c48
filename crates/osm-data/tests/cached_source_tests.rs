//! Tests for the cache-through data source.

use async_trait::async_trait;
use geo_types::{line_string, Geometry, Point};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use osm_data::{
    CachedSource, Feature, FeatureCollection, Geocoder, LayerKind, MapDataSource, ReverseGeocode,
    StreetEdge, StreetNetwork,
};
use poster_common::{LatLon, PosterError, PosterResult};
use storage::ContentCache;
use tempfile::TempDir;

const LAURIS: LatLon = LatLon {
    lat: 43.7833,
    lon: 5.3167,
};

/// Source that counts calls and can be told to fail.
#[derive(Default)]
struct CountingSource {
    network_calls: AtomicUsize,
    feature_calls: AtomicUsize,
    geocode_calls: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl MapDataSource for CountingSource {
    async fn street_network(&self, _center: LatLon, _dist: f64) -> PosterResult<StreetNetwork> {
        self.network_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(PosterError::fetch("street network", "offline"));
        }
        Ok(StreetNetwork {
            edges: vec![StreetEdge {
                way_id: 7,
                highway: Some("primary".to_string()),
                geometry: line_string![(x: 5.31, y: 43.78), (x: 5.32, y: 43.79)],
            }],
        })
    }

    async fn features(
        &self,
        _center: LatLon,
        _dist: f64,
        layer: LayerKind,
    ) -> PosterResult<FeatureCollection> {
        self.feature_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(PosterError::fetch(layer.name(), "offline"));
        }
        Ok(FeatureCollection::new(
            layer.name(),
            vec![Feature {
                id: 1,
                geometry: Geometry::Point(Point::new(5.3167, 43.7833)),
                tags: [("natural".to_string(), "water".to_string())].into_iter().collect(),
            }],
        ))
    }
}

#[async_trait]
impl Geocoder for CountingSource {
    async fn geocode(&self, _city: &str, _country: &str) -> PosterResult<LatLon> {
        self.geocode_calls.fetch_add(1, Ordering::SeqCst);
        Ok(LAURIS)
    }

    async fn reverse(&self, _center: LatLon, _language: &str) -> PosterResult<ReverseGeocode> {
        self.geocode_calls.fetch_add(1, Ordering::SeqCst);
        Ok(ReverseGeocode {
            city: "Lauris".to_string(),
            country: "France".to_string(),
            full_address: "Lauris, France".to_string(),
        })
    }
}

fn cached(dir: &TempDir) -> CachedSource<CountingSource> {
    CachedSource::new(CountingSource::default(), ContentCache::new(dir.path()))
}

// ============================================================================
// Hits and misses
// ============================================================================

#[tokio::test]
async fn test_second_fetch_is_served_from_cache() {
    let dir = TempDir::new().unwrap();
    let source = cached(&dir);

    let first = source.street_network(LAURIS, 4000.0).await.unwrap();
    let second = source.street_network(LAURIS, 4000.0).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(source.inner().network_calls.load(Ordering::SeqCst), 1);
    assert_eq!(source.cache().stats().hits, 1);
}

#[tokio::test]
async fn test_cache_survives_a_new_source() {
    let dir = TempDir::new().unwrap();
    cached(&dir).features(LAURIS, 4000.0, LayerKind::Water).await.unwrap();

    let fresh = cached(&dir);
    let water = fresh.features(LAURIS, 4000.0, LayerKind::Water).await.unwrap();
    assert_eq!(water.len(), 1);
    assert_eq!(fresh.inner().feature_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_layers_and_radii_are_cached_separately() {
    let dir = TempDir::new().unwrap();
    let source = cached(&dir);

    source.features(LAURIS, 4000.0, LayerKind::Water).await.unwrap();
    source.features(LAURIS, 4000.0, LayerKind::Parks).await.unwrap();
    source.features(LAURIS, 5000.0, LayerKind::Water).await.unwrap();

    assert_eq!(source.inner().feature_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_geocode_cached_case_insensitively() {
    let dir = TempDir::new().unwrap();
    let source = cached(&dir);

    source.geocode("Lauris", "France").await.unwrap();
    let again = source.geocode("lauris", "france").await.unwrap();

    assert_eq!(again, LAURIS);
    assert_eq!(source.inner().geocode_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_reverse_is_never_cached() {
    let dir = TempDir::new().unwrap();
    let source = cached(&dir);

    source.reverse(LAURIS, "fr").await.unwrap();
    source.reverse(LAURIS, "fr").await.unwrap();
    assert_eq!(source.inner().geocode_calls.load(Ordering::SeqCst), 2);
}

// ============================================================================
// Failure handling
// ============================================================================

#[tokio::test]
async fn test_fetch_errors_are_not_cached() {
    let dir = TempDir::new().unwrap();
    let failing = CachedSource::new(
        CountingSource {
            fail: true,
            ..Default::default()
        },
        ContentCache::new(dir.path()),
    );

    assert!(failing.street_network(LAURIS, 4000.0).await.is_err());
    assert!(failing.street_network(LAURIS, 4000.0).await.is_err());
    assert_eq!(failing.inner().network_calls.load(Ordering::SeqCst), 2);
    assert_eq!(failing.cache().stats().writes, 0);
}

#[tokio::test]
async fn test_corrupt_entry_aborts_the_request() {
    let dir = TempDir::new().unwrap();
    let source = cached(&dir);
    source.street_network(LAURIS, 4000.0).await.unwrap();

    let key = storage::CacheKey::graph(LAURIS, 4000.0).to_string();
    std::fs::write(source.cache().path_for(&key), b"not json").unwrap();

    let err = source.street_network(LAURIS, 4000.0).await.unwrap_err();
    assert!(matches!(err, PosterError::CacheRead { .. }));
    assert_eq!(source.inner().network_calls.load(Ordering::SeqCst), 1);
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_write_failure_still_returns_data() {
    // Reads under /proc miss cleanly; directory creation there fails.
    let source = CachedSource::new(
        CountingSource::default(),
        ContentCache::new("/proc/city-poster-cache"),
    );

    let network = source.street_network(LAURIS, 4000.0).await.unwrap();
    assert_eq!(network.len(), 1);
    assert_eq!(source.cache().stats().write_failures, 1);
}

#[tokio::test]
async fn test_shared_source_across_tasks() {
    let dir = TempDir::new().unwrap();
    let source: Arc<dyn MapDataSource> = Arc::new(cached(&dir));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let source = Arc::clone(&source);
            tokio::spawn(async move { source.features(LAURIS, 4000.0, LayerKind::Parks).await })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap().len(), 1);
    }
}
