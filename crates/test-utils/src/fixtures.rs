//! Common test fixtures for city-poster tests.
//!
//! Geometry is built in WGS84 around a handful of real places so projected
//! output lands inside the crop window.

use geo_types::{Geometry, LineString, Polygon};
use osm_data::{Feature, FeatureCollection, StreetEdge, StreetNetwork, Tags};
use poster_common::LatLon;

/// Well-known centers.
pub mod places {
    use poster_common::LatLon;

    /// Small inland village in Provence.
    pub const LAURIS: LatLon = LatLon {
        lat: 43.7833,
        lon: 5.3167,
    };

    /// Coastal city.
    pub const NICE: LatLon = LatLon {
        lat: 43.7102,
        lon: 7.2620,
    };

    /// Southern and western hemisphere.
    pub const BUENOS_AIRES: LatLon = LatLon {
        lat: -34.6037,
        lon: -58.3816,
    };
}

/// Theme files as they appear on disk.
pub mod themes {
    pub const NOIR: &str = r##"{
        "name": "Noir",
        "description": "Pure black background with white roads",
        "bg": "#000000",
        "text": "#FFFFFF",
        "gradient_color": "#000000",
        "water": "#0A0A0A",
        "parks": "#111111",
        "road_motorway": "#FFFFFF",
        "road_primary": "#E0E0E0",
        "road_secondary": "#B0B0B0",
        "road_tertiary": "#909090",
        "road_residential": "#606060",
        "road_default": "#909090"
    }"##;

    pub const BLUEPRINT: &str = r##"{
        "name": "Blueprint",
        "description": "Architectural blueprint aesthetic",
        "bg": "#1A3A5C",
        "text": "#E8F4FF",
        "gradient_color": "#1A3A5C",
        "water": "#0F2840",
        "parks": "#1E4570",
        "road_motorway": "#E8F4FF",
        "road_primary": "#C5DCF0",
        "road_secondary": "#9FC5E8",
        "road_tertiary": "#7BAED4",
        "road_residential": "#5A96C0",
        "road_default": "#7BAED4",
        "buildings": "#25507A"
    }"##;

    /// Valid JSON with only two roles.
    pub const PARTIAL: &str = r##"{ "name": "Partial", "bg": "#FFFFFF", "text": "#000000" }"##;
}

/// Tag map from pairs.
pub fn tags(pairs: &[(&str, &str)]) -> Tags {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Axis-aligned square in degrees around `center`.
pub fn square(center: LatLon, half_deg: f64) -> Polygon<f64> {
    let (x, y) = (center.lon, center.lat);
    Polygon::new(
        LineString::from(vec![
            (x - half_deg, y - half_deg),
            (x + half_deg, y - half_deg),
            (x + half_deg, y + half_deg),
            (x - half_deg, y + half_deg),
            (x - half_deg, y - half_deg),
        ]),
        vec![],
    )
}

pub fn feature(id: i64, geometry: Geometry<f64>, pairs: &[(&str, &str)]) -> Feature {
    Feature {
        id,
        geometry,
        tags: tags(pairs),
    }
}

/// One polygon feature of `half_deg` around `center`.
pub fn polygon_layer(
    layer: &str,
    center: LatLon,
    half_deg: f64,
    pairs: &[(&str, &str)],
) -> FeatureCollection {
    FeatureCollection::new(
        layer,
        vec![feature(1, Geometry::Polygon(square(center, half_deg)), pairs)],
    )
}

/// One east-west line through `center`.
pub fn line_layer(layer: &str, center: LatLon, half_deg: f64, pairs: &[(&str, &str)]) -> FeatureCollection {
    let line = LineString::from(vec![
        (center.lon - half_deg, center.lat),
        (center.lon + half_deg, center.lat),
    ]);
    FeatureCollection::new(layer, vec![feature(1, Geometry::LineString(line), pairs)])
}

/// A small grid of streets around `center`, one edge per road class.
pub fn street_network(center: LatLon) -> StreetNetwork {
    let highways = [
        Some("motorway"),
        Some("primary"),
        Some("secondary"),
        Some("tertiary"),
        Some("residential"),
        Some("service"),
        None,
    ];
    let step = 0.002;
    let edges = highways
        .iter()
        .enumerate()
        .map(|(i, highway)| {
            let offset = (i as f64 - 3.0) * step;
            StreetEdge {
                way_id: i as i64 + 1,
                highway: highway.map(str::to_string),
                geometry: LineString::from(vec![
                    (center.lon - 0.01, center.lat + offset),
                    (center.lon + 0.01, center.lat + offset),
                ]),
            }
        })
        .collect();
    StreetNetwork { edges }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_is_closed() {
        let sq = square(places::LAURIS, 0.01);
        let ring = &sq.exterior().0;
        assert_eq!(ring.len(), 5);
        assert_eq!(ring.first(), ring.last());
    }

    #[test]
    fn test_network_has_every_class() {
        let network = street_network(places::LAURIS);
        assert_eq!(network.len(), 7);
        assert!(network.edges.iter().any(|e| e.highway.is_none()));
    }
}
