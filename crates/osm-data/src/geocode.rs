//! Nominatim geocoding.
//!
//! Nominatim's usage policy allows one request per second. The client
//! enforces the interval itself: every call waits until `min_interval` has
//! passed since the previous one, across all tasks sharing the client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, instrument};

use poster_common::{LatLon, PosterError, PosterResult};

use crate::source::Geocoder;

/// Names of the place at a point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReverseGeocode {
    pub city: String,
    pub country: String,
    pub full_address: String,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: String,
}

#[derive(Debug, Default, Deserialize)]
struct ReverseResult {
    #[serde(default)]
    address: HashMap<String, String>,
    #[serde(default)]
    display_name: String,
}

impl ReverseResult {
    fn into_names(self) -> ReverseGeocode {
        let city = ["city", "town", "village", "municipality"]
            .iter()
            .find_map(|k| self.address.get(*k))
            .cloned()
            .unwrap_or_else(|| "Unknown".to_string());
        let country = self.address.get("country").cloned().unwrap_or_default();
        ReverseGeocode {
            city,
            country,
            full_address: self.display_name,
        }
    }
}

/// Self-throttling Nominatim client.
pub struct NominatimClient {
    client: Client,
    base_url: String,
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl NominatimClient {
    pub fn new(
        base_url: impl Into<String>,
        user_agent: &str,
        timeout: Duration,
        min_interval: Duration,
    ) -> PosterResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()
            .map_err(|e| PosterError::InternalError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            min_interval,
            last_call: Mutex::new(None),
        })
    }

    /// Wait for the request slot. The lock is held through the sleep so
    /// concurrent callers queue up one interval apart.
    async fn throttle(&self) {
        let mut last = self.last_call.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + self.min_interval;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[async_trait]
impl Geocoder for NominatimClient {
    #[instrument(skip(self))]
    async fn geocode(&self, city: &str, country: &str) -> PosterResult<LatLon> {
        let query = format!("{}, {}", city, country);
        self.throttle().await;

        let geocoding = |e: reqwest::Error| PosterError::Geocoding {
            query: query.clone(),
            message: e.to_string(),
        };

        let results: Vec<SearchResult> = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", query.as_str()), ("format", "json"), ("limit", "1")])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(geocoding)?
            .json()
            .await
            .map_err(geocoding)?;

        let Some(first) = results.into_iter().next() else {
            return Err(PosterError::LocationNotFound(query));
        };

        let parse = |value: &str| {
            value.parse::<f64>().map_err(|e| PosterError::Geocoding {
                query: query.clone(),
                message: format!("bad coordinate '{}': {}", value, e),
            })
        };
        let point = LatLon::validated(parse(&first.lat)?, parse(&first.lon)?)?;

        info!(
            address = %first.display_name,
            lat = point.lat,
            lon = point.lon,
            "Geocoded location"
        );
        Ok(point)
    }

    #[instrument(skip(self), fields(lat = center.lat, lon = center.lon))]
    async fn reverse(&self, center: LatLon, language: &str) -> PosterResult<ReverseGeocode> {
        self.throttle().await;

        let query = center.to_string();
        let geocoding = |e: reqwest::Error| PosterError::Geocoding {
            query: query.clone(),
            message: e.to_string(),
        };

        let lat = center.lat.to_string();
        let lon = center.lon.to_string();
        let result: ReverseResult = self
            .client
            .get(format!("{}/reverse", self.base_url))
            .query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("format", "json"),
                ("accept-language", language),
                ("addressdetails", "1"),
            ])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(geocoding)?
            .json()
            .await
            .map_err(geocoding)?;

        let names = result.into_names();
        debug!(city = %names.city, country = %names.country, "Reverse geocoded");
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverse_prefers_city_then_town() {
        let result: ReverseResult = serde_json::from_str(
            r#"{"display_name": "Lauris, Vaucluse, France",
                "address": {"village": "Lauris", "town": "Pertuis", "country": "France"}}"#,
        )
        .unwrap();
        let names = result.into_names();
        assert_eq!(names.city, "Pertuis");
        assert_eq!(names.country, "France");
        assert_eq!(names.full_address, "Lauris, Vaucluse, France");
    }

    #[test]
    fn test_reverse_without_locality_is_unknown() {
        let names = ReverseResult::default().into_names();
        assert_eq!(names.city, "Unknown");
        assert_eq!(names.country, "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_spaces_calls() {
        let client = NominatimClient::new(
            "http://localhost/",
            "test",
            Duration::from_secs(1),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(client.base_url, "http://localhost");

        let start = Instant::now();
        client.throttle().await;
        client.throttle().await;
        client.throttle().await;
        assert!(start.elapsed() >= Duration::from_secs(2));
    }
}
