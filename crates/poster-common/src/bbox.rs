//! Bounding box types and operations.

use serde::{Deserialize, Serialize};

use crate::point::LatLon;

/// Mean earth radius used for degree/meter conversion around a point.
pub const EARTH_RADIUS_M: f64 = 6_371_009.0;

/// A geographic or projected bounding box.
///
/// Geographic boxes hold degrees (x = longitude, y = latitude); projected
/// boxes hold meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Geographic box reaching `dist` meters north, south, east and west of
    /// `center`, on a spherical earth.
    pub fn around(center: LatLon, dist: f64) -> Self {
        let delta_lat = (dist / EARTH_RADIUS_M).to_degrees();
        let cos_lat = center.lat.to_radians().cos().max(1e-6);
        let delta_lon = delta_lat / cos_lat;
        Self::new(
            center.lon - delta_lon,
            (center.lat - delta_lat).max(-90.0),
            center.lon + delta_lon,
            (center.lat + delta_lat).min(90.0),
        )
    }

    /// Width of the bounding box in coordinate units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the bounding box in coordinate units.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Overpass `(south,west,north,east)` filter.
    pub fn overpass_filter(&self) -> String {
        format!(
            "{:.7},{:.7},{:.7},{:.7}",
            self.min_y, self.min_x, self.max_y, self.max_x
        )
    }
}
