//! Geometry selection and reprojection for fetched layers.
//!
//! Polygon layers keep only areal geometries and line layers only linear
//! ones, so point features never render as stray dots.

use geo::MapCoords;
use geo_types::{Coord, Geometry, LineString, Polygon};
use rayon::prelude::*;

use osm_data::{Feature, FeatureCollection, StreetNetwork};
use projection::UtmProjection;

use crate::style::RoadClass;

/// Values of `place`, `water` or `natural` that mark open water. Such
/// polygons would flood the map and are never drawn as water.
const OPEN_WATER: [&str; 4] = ["sea", "ocean", "bay", "strait"];
const OPEN_WATER_KEYS: [&str; 3] = ["place", "water", "natural"];

pub fn is_open_water(feature: &Feature) -> bool {
    OPEN_WATER_KEYS
        .iter()
        .filter_map(|key| feature.tag(key))
        .any(|value| OPEN_WATER.contains(&value))
}

/// Polygon parts of every areal feature.
pub fn polygons(collection: &FeatureCollection) -> Vec<Polygon<f64>> {
    collection.features.iter().flat_map(feature_polygons).collect()
}

/// Water polygons without open sea.
pub fn water_polygons(collection: &FeatureCollection) -> Vec<Polygon<f64>> {
    collection
        .features
        .iter()
        .filter(|f| !is_open_water(f))
        .flat_map(feature_polygons)
        .collect()
}

/// Line parts of every linear feature.
pub fn lines(collection: &FeatureCollection) -> Vec<LineString<f64>> {
    collection
        .features
        .iter()
        .flat_map(|f| match &f.geometry {
            Geometry::LineString(line) => vec![line.clone()],
            Geometry::MultiLineString(lines) => lines.0.clone(),
            _ => Vec::new(),
        })
        .collect()
}

fn feature_polygons(feature: &Feature) -> Vec<Polygon<f64>> {
    match &feature.geometry {
        Geometry::Polygon(polygon) => vec![polygon.clone()],
        Geometry::MultiPolygon(multi) => multi.0.clone(),
        _ => Vec::new(),
    }
}

// ============================================================================
// Projection
// ============================================================================

fn forward(projection: &UtmProjection, c: Coord<f64>) -> Coord<f64> {
    let (x, y) = projection.forward(c.y, c.x);
    Coord { x, y }
}

/// WGS84 polygons into projected meters.
pub fn project_polygons(polygons: &[Polygon<f64>], projection: &UtmProjection) -> Vec<Polygon<f64>> {
    polygons
        .par_iter()
        .map(|p| p.map_coords(|c| forward(projection, c)))
        .collect()
}

/// WGS84 lines into projected meters.
pub fn project_lines(lines: &[LineString<f64>], projection: &UtmProjection) -> Vec<LineString<f64>> {
    lines
        .par_iter()
        .map(|l| l.map_coords(|c| forward(projection, c)))
        .collect()
}

/// Projected road lines with their class.
pub fn project_network(
    network: &StreetNetwork,
    projection: &UtmProjection,
) -> Vec<(RoadClass, LineString<f64>)> {
    network
        .edges
        .par_iter()
        .map(|edge| {
            (
                RoadClass::from_highway(edge.highway.as_deref()),
                edge.geometry.map_coords(|c| forward(projection, c)),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{line_string, polygon, MultiPolygon, Point};

    fn feature(geometry: Geometry<f64>, tags: &[(&str, &str)]) -> Feature {
        Feature {
            id: 1,
            geometry,
            tags: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn square() -> Polygon<f64> {
        polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)]
    }

    #[test]
    fn test_lake_kept_sea_excluded() {
        let fc = FeatureCollection::new(
            "water",
            vec![
                feature(square().into(), &[("natural", "water")]),
                feature(square().into(), &[("natural", "water"), ("place", "sea")]),
                feature(square().into(), &[("natural", "bay")]),
                feature(square().into(), &[("water", "strait")]),
            ],
        );
        assert_eq!(water_polygons(&fc).len(), 1);
    }

    #[test]
    fn test_points_never_become_polygons() {
        let fc = FeatureCollection::new(
            "parks",
            vec![
                feature(Point::new(0.5, 0.5).into(), &[("leisure", "park")]),
                feature(
                    MultiPolygon::new(vec![square(), square()]).into(),
                    &[("leisure", "park")],
                ),
            ],
        );
        assert_eq!(polygons(&fc).len(), 2);
        assert!(lines(&fc).is_empty());
    }

    #[test]
    fn test_lines_from_linear_features_only() {
        let fc = FeatureCollection::new(
            "railways",
            vec![
                feature(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)].into(), &[("railway", "rail")]),
                feature(square().into(), &[("railway", "rail")]),
            ],
        );
        assert_eq!(lines(&fc).len(), 1);
    }

    #[test]
    fn test_projection_lands_in_utm_meters() {
        let utm = UtmProjection::for_point(43.7833, 5.3167);
        let projected = project_lines(
            &[line_string![(x: 5.3167, y: 43.7833), (x: 5.3267, y: 43.7833)]],
            &utm,
        );
        let line = &projected[0];
        // 0.01 degree of longitude at 43.8N is about 800 m
        let dx = line.0[1].x - line.0[0].x;
        assert!(dx > 780.0 && dx < 820.0, "dx = {}", dx);
        assert!(line.0[0].y > 4_800_000.0);
    }
}
