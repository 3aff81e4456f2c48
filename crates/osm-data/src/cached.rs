//! Cache-through wrapper for data sources.
//!
//! A hit is returned without touching the inner source. On a miss the inner
//! source is called and the result stored. A failed store is logged and the
//! fresh value is still returned; a failed read aborts the request.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use tracing::{debug, warn};

use poster_common::{LatLon, PosterResult};
use storage::{CacheKey, ContentCache};

use crate::geocode::ReverseGeocode;
use crate::model::{FeatureCollection, StreetNetwork};
use crate::source::{Geocoder, MapDataSource};
use crate::tags::LayerKind;

pub struct CachedSource<S> {
    inner: S,
    cache: ContentCache,
}

impl<S> CachedSource<S> {
    pub fn new(inner: S, cache: ContentCache) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn through<T, F, Fut>(&self, key: CacheKey, fetch: F) -> PosterResult<T>
    where
        T: Serialize + DeserializeOwned + Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = PosterResult<T>> + Send,
    {
        let key = key.to_string();
        if let Some(value) = self.cache.get::<T>(&key).await? {
            debug!(key = %key, "Using cached data");
            return Ok(value);
        }

        let value = fetch().await?;
        if let Err(e) = self.cache.set(&key, &value).await {
            warn!(key = %key, error = %e, "Failed to cache result, continuing without it");
        }
        Ok(value)
    }
}

#[async_trait]
impl<S: Geocoder> Geocoder for CachedSource<S> {
    async fn geocode(&self, city: &str, country: &str) -> PosterResult<LatLon> {
        self.through(CacheKey::coordinates(city, country), || {
            self.inner.geocode(city, country)
        })
        .await
    }

    async fn reverse(&self, center: LatLon, language: &str) -> PosterResult<ReverseGeocode> {
        self.inner.reverse(center, language).await
    }
}

#[async_trait]
impl<S: MapDataSource> MapDataSource for CachedSource<S> {
    async fn street_network(&self, center: LatLon, dist: f64) -> PosterResult<StreetNetwork> {
        self.through(CacheKey::graph(center, dist), || {
            self.inner.street_network(center, dist)
        })
        .await
    }

    async fn features(
        &self,
        center: LatLon,
        dist: f64,
        layer: LayerKind,
    ) -> PosterResult<FeatureCollection> {
        let key = CacheKey::features(layer.name(), center, dist, layer.query().canonical_filters());
        self.through(key, || self.inner.features(center, dist, layer))
            .await
    }
}
