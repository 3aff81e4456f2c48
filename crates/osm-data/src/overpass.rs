//! Overpass API client.
//!
//! Every query asks for `out geom`, so ways carry their node coordinates
//! inline and relations carry member geometries; no second node lookup is
//! needed.

use async_trait::async_trait;
use geo_types::{Coord, Geometry, LineString, MultiLineString, Point, Polygon};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use poster_common::{BoundingBox, LatLon, PosterError, PosterResult};

use crate::assemble::build_multipolygon;
use crate::model::{normalize_tags, Feature, FeatureCollection, StreetEdge, StreetNetwork, Tags};
use crate::source::MapDataSource;
use crate::tags::{LayerKind, TagQuery};

/// `highway` values that never belong to the drawn network.
const EXCLUDED_HIGHWAYS: &str =
    "abandoned|construction|no|planned|platform|proposed|raceway|razed";

const GRAPH_LAYER: &str = "street network";

// ============================================================================
// Response model
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<OverpassElement>,
    /// Set by the server on runtime errors such as query timeouts.
    #[serde(default)]
    pub remark: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OverpassElement {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: i64,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    #[serde(default)]
    pub geometry: Vec<Option<GeomPoint>>,
    #[serde(default)]
    pub members: Vec<OverpassMember>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct GeomPoint {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Deserialize)]
pub struct OverpassMember {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub geometry: Vec<Option<GeomPoint>>,
}

fn coords(points: &[Option<GeomPoint>]) -> Vec<Coord<f64>> {
    points
        .iter()
        .flatten()
        .map(|p| Coord { x: p.lon, y: p.lat })
        .collect()
}

// ============================================================================
// Query builders
// ============================================================================

/// Overpass QL for every way of the street network inside `bbox`.
pub fn network_query(bbox: &BoundingBox, timeout: Duration) -> String {
    format!(
        "[out:json][timeout:{}];\nway[\"highway\"][\"area\"!~\"yes\"][\"highway\"!~\"^({})$\"]({});\nout geom;",
        timeout.as_secs().max(1),
        EXCLUDED_HIGHWAYS,
        bbox.overpass_filter()
    )
}

/// Overpass QL for nodes, ways and relations matching any filter of `query`.
pub fn features_query(bbox: &BoundingBox, query: &TagQuery, timeout: Duration) -> String {
    let filter = bbox.overpass_filter();
    let mut ql = format!("[out:json][timeout:{}];\n(\n", timeout.as_secs().max(1));
    for tag in &query.filters {
        ql.push_str(&format!("  nwr{}({});\n", tag.selector(), filter));
    }
    ql.push_str(");\nout geom;");
    ql
}

// ============================================================================
// Response parsing
// ============================================================================

/// Street network edges from a network query response.
pub fn parse_network(response: OverpassResponse) -> StreetNetwork {
    let edges = response
        .elements
        .into_iter()
        .filter(|e| e.kind == "way")
        .filter_map(|e| {
            let line = coords(&e.geometry);
            if line.len() < 2 {
                return None;
            }
            let tags = normalize_tags(e.tags);
            Some(StreetEdge {
                way_id: e.id,
                highway: tags.get("highway").cloned(),
                geometry: LineString::from(line),
            })
        })
        .collect();
    StreetNetwork { edges }
}

/// Features from a tag query response. Elements that do not match the query
/// themselves (untagged relation members) are dropped.
pub fn parse_features(layer: &str, query: &TagQuery, response: OverpassResponse) -> FeatureCollection {
    let features = response
        .elements
        .into_iter()
        .filter_map(|e| {
            let tags = normalize_tags(e.tags.clone());
            if !query.matches(&tags) {
                return None;
            }
            let geometry = element_geometry(&e, &tags)?;
            Some(Feature {
                id: e.id,
                geometry,
                tags,
            })
        })
        .collect();
    FeatureCollection::new(layer, features)
}

fn element_geometry(element: &OverpassElement, tags: &Tags) -> Option<Geometry<f64>> {
    match element.kind.as_str() {
        "node" => Some(Geometry::Point(Point::new(element.lon?, element.lat?))),
        "way" => {
            let line = coords(&element.geometry);
            if line.len() < 2 {
                return None;
            }
            let closed = line.len() >= 4 && line.first() == line.last();
            if closed && way_is_area(tags) {
                Some(Geometry::Polygon(Polygon::new(LineString::from(line), Vec::new())))
            } else {
                Some(Geometry::LineString(LineString::from(line)))
            }
        }
        "relation" => {
            let is_area = matches!(
                tags.get("type").map(String::as_str),
                Some("multipolygon") | Some("boundary")
            );
            let ways = element.members.iter().filter(|m| m.kind == "way");
            if is_area {
                let mut outers = Vec::new();
                let mut inners = Vec::new();
                for member in ways {
                    let line = coords(&member.geometry);
                    if member.role == "inner" {
                        inners.push(line);
                    } else {
                        outers.push(line);
                    }
                }
                build_multipolygon(outers, inners).map(Geometry::MultiPolygon)
            } else {
                let lines: Vec<LineString<f64>> = ways
                    .map(|m| coords(&m.geometry))
                    .filter(|l| l.len() >= 2)
                    .map(LineString::from)
                    .collect();
                if lines.is_empty() {
                    None
                } else {
                    Some(Geometry::MultiLineString(MultiLineString::new(lines)))
                }
            }
        }
        _ => None,
    }
}

/// Whether a closed way describes an area rather than a loop of line.
fn way_is_area(tags: &Tags) -> bool {
    match tags.get("area").map(String::as_str) {
        Some("yes") => return true,
        Some("no") => return false,
        _ => {}
    }
    if tags.get("waterway").map(String::as_str) == Some("riverbank") {
        return true;
    }
    if tags.get("natural").map(String::as_str) == Some("coastline") {
        return false;
    }
    const LINEAR_KEYS: [&str; 6] = ["highway", "railway", "barrier", "waterway", "boundary", "route"];
    !LINEAR_KEYS.iter().any(|k| tags.contains_key(*k))
}

// ============================================================================
// Client
// ============================================================================

/// HTTP client for an Overpass interpreter endpoint.
pub struct OverpassClient {
    client: Client,
    endpoint: String,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
    graph_pause: Duration,
    feature_pause: Duration,
}

impl OverpassClient {
    pub fn new(endpoint: impl Into<String>, user_agent: &str, timeout: Duration) -> PosterResult<Self> {
        let client = Client::builder()
            .timeout(timeout + Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(30))
            .user_agent(user_agent)
            .build()
            .map_err(|e| PosterError::InternalError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            timeout,
            max_retries: 2,
            retry_delay: Duration::from_secs(2),
            graph_pause: Duration::from_millis(500),
            feature_pause: Duration::from_millis(300),
        })
    }

    /// Run a query, retrying rate limits and gateway timeouts with
    /// exponential backoff.
    async fn execute(&self, layer: &str, query: &str) -> PosterResult<OverpassResponse> {
        let mut attempt = 0;
        let mut delay = self.retry_delay;

        loop {
            let result = self.execute_once(layer, query).await;
            match result {
                Ok(response) => return Ok(response),
                Err(Retry::Fatal(e)) => return Err(e),
                Err(Retry::Transient(e)) if attempt >= self.max_retries => return Err(e),
                Err(Retry::Transient(e)) => {
                    attempt += 1;
                    warn!(
                        layer,
                        error = %e,
                        retry = attempt,
                        max_retries = self.max_retries,
                        delay_secs = delay.as_secs(),
                        "Overpass request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                }
            }
        }
    }

    async fn execute_once(&self, layer: &str, query: &str) -> Result<OverpassResponse, Retry> {
        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("data", query)])
            .send()
            .await
            .map_err(|e| {
                let err = PosterError::fetch(layer, e);
                Retry::Transient(err)
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::GATEWAY_TIMEOUT {
            return Err(Retry::Transient(PosterError::fetch(layer, format!("HTTP {}", status))));
        }
        if !status.is_success() {
            return Err(Retry::Fatal(PosterError::fetch(layer, format!("HTTP {}", status))));
        }

        let parsed: OverpassResponse = response
            .json()
            .await
            .map_err(|e| Retry::Fatal(PosterError::fetch(layer, format!("invalid response: {}", e))))?;

        if let Some(remark) = parsed.remark.as_deref() {
            if remark.contains("error") {
                return Err(Retry::Transient(PosterError::fetch(layer, remark)));
            }
        }
        Ok(parsed)
    }
}

enum Retry {
    Transient(PosterError),
    Fatal(PosterError),
}

#[async_trait]
impl MapDataSource for OverpassClient {
    #[instrument(skip(self), fields(lat = center.lat, lon = center.lon))]
    async fn street_network(&self, center: LatLon, dist: f64) -> PosterResult<StreetNetwork> {
        let start = Instant::now();
        let bbox = BoundingBox::around(center, dist);
        let response = self
            .execute(GRAPH_LAYER, &network_query(&bbox, self.timeout))
            .await?;
        let network = parse_network(response);
        info!(
            edges = network.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fetched street network"
        );
        tokio::time::sleep(self.graph_pause).await;
        Ok(network)
    }

    #[instrument(skip(self), fields(layer = layer.name(), lat = center.lat, lon = center.lon))]
    async fn features(&self, center: LatLon, dist: f64, layer: LayerKind) -> PosterResult<FeatureCollection> {
        let start = Instant::now();
        let bbox = BoundingBox::around(center, dist);
        let query = layer.query();
        let ql = features_query(&bbox, &query, self.timeout);
        debug!(query = %ql, "Overpass query");

        let response = self.execute(layer.name(), &ql).await?;
        let collection = parse_features(layer.name(), &query, response);
        info!(
            features = collection.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fetched layer"
        );
        tokio::time::sleep(self.feature_pause).await;
        Ok(collection)
    }
}
