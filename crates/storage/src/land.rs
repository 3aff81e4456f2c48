//! Land polygon reference dataset.
//!
//! The OSM land polygon shapefile (WGS84, split variant) is large, so it is
//! read at most once per store, on first use, behind an acquire-once guard.
//! A missing or unreadable file marks the dataset unavailable for the life
//! of the store; callers then fall back to other land heuristics.

use geo::BoundingRect;
use geo_types::{Coord, LineString, Polygon, Rect};
use once_cell::sync::OnceCell;
use shapefile::PolygonRing;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use poster_common::BoundingBox;

struct IndexedPolygon {
    bounds: Rect<f64>,
    polygon: Polygon<f64>,
}

/// Lazily loaded land polygons.
pub struct LandPolygonStore {
    path: Option<PathBuf>,
    loaded: OnceCell<Option<Arc<Vec<IndexedPolygon>>>>,
}

impl LandPolygonStore {
    /// Store backed by the shapefile at `path`. Nothing is read until the
    /// first query.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            loaded: OnceCell::new(),
        }
    }

    /// Store with no dataset; every query reports unavailable.
    pub fn unavailable() -> Self {
        let loaded = OnceCell::new();
        let _ = loaded.set(None);
        Self { path: None, loaded }
    }

    /// Store over polygons already in memory.
    pub fn from_polygons(polygons: Vec<Polygon<f64>>) -> Self {
        let loaded = OnceCell::new();
        let _ = loaded.set(Some(Arc::new(index(polygons))));
        Self { path: None, loaded }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Land polygons whose bounds intersect `bbox` (degrees).
    ///
    /// Returns `None` when the dataset is unavailable, which is distinct from
    /// an empty result over open water.
    pub fn polygons_in(&self, bbox: &BoundingBox) -> Option<Vec<Polygon<f64>>> {
        let polygons = self.loaded.get_or_init(|| self.load()).as_ref()?;

        Some(
            polygons
                .iter()
                .filter(|p| {
                    let min = p.bounds.min();
                    let max = p.bounds.max();
                    min.x < bbox.max_x && max.x > bbox.min_x && min.y < bbox.max_y && max.y > bbox.min_y
                })
                .map(|p| p.polygon.clone())
                .collect(),
        )
    }

    fn load(&self) -> Option<Arc<Vec<IndexedPolygon>>> {
        let path = self.path.as_ref()?;
        if !path.is_file() {
            warn!(path = %path.display(), "Land polygon dataset not found");
            return None;
        }

        let start = Instant::now();
        let shapes = match shapefile::read_shapes_as::<_, shapefile::Polygon>(path) {
            Ok(shapes) => shapes,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read land polygons");
                return None;
            }
        };

        let mut polygons = Vec::new();
        for shape in &shapes {
            polygons.extend(shape_to_polygons(shape));
        }

        info!(
            polygons = polygons.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded land polygons"
        );
        Some(Arc::new(index(polygons)))
    }
}

fn index(polygons: Vec<Polygon<f64>>) -> Vec<IndexedPolygon> {
    polygons
        .into_iter()
        .filter_map(|polygon| {
            polygon
                .bounding_rect()
                .map(|bounds| IndexedPolygon { bounds, polygon })
        })
        .collect()
}

/// Shapefile polygons list outer rings each followed by their holes.
fn shape_to_polygons(shape: &shapefile::Polygon) -> Vec<Polygon<f64>> {
    let mut out: Vec<(LineString<f64>, Vec<LineString<f64>>)> = Vec::new();

    for ring in shape.rings() {
        let coords: Vec<Coord<f64>> = ring
            .points()
            .iter()
            .map(|p| Coord { x: p.x, y: p.y })
            .collect();
        match ring {
            PolygonRing::Outer(_) => out.push((LineString::from(coords), Vec::new())),
            PolygonRing::Inner(_) => {
                if let Some((_, holes)) = out.last_mut() {
                    holes.push(LineString::from(coords));
                }
            }
        }
    }

    out.into_iter()
        .map(|(exterior, holes)| Polygon::new(exterior, holes))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::polygon;

    #[test]
    fn test_unavailable_store() {
        let store = LandPolygonStore::unavailable();
        assert!(store
            .polygons_in(&BoundingBox::new(0.0, 0.0, 1.0, 1.0))
            .is_none());
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let store = LandPolygonStore::new("/nonexistent/land_polygons.shp");
        assert!(store
            .polygons_in(&BoundingBox::new(0.0, 0.0, 1.0, 1.0))
            .is_none());
    }

    #[test]
    fn test_bbox_filtering() {
        let near = polygon![(x: 5.0, y: 43.0), (x: 6.0, y: 43.0), (x: 6.0, y: 44.0), (x: 5.0, y: 44.0)];
        let far = polygon![(x: 50.0, y: 10.0), (x: 51.0, y: 10.0), (x: 51.0, y: 11.0)];
        let store = LandPolygonStore::from_polygons(vec![near.clone(), far]);

        let hits = store
            .polygons_in(&BoundingBox::new(5.2, 43.7, 5.4, 43.9))
            .unwrap();
        assert_eq!(hits, vec![near]);

        let none = store
            .polygons_in(&BoundingBox::new(-10.0, -10.0, -9.0, -9.0))
            .unwrap();
        assert!(none.is_empty());
    }
}
