//! Vector data model for fetched layers.

use geo_types::{Geometry, LineString};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Normalized OSM tags: one value per key.
pub type Tags = BTreeMap<String, String>;

/// First entry of a multi-valued tag such as `primary;secondary`.
pub fn first_value(raw: &str) -> &str {
    raw.split(';').next().unwrap_or(raw).trim()
}

/// Collapse raw tags into single values. Empty values are dropped.
pub fn normalize_tags(raw: HashMap<String, String>) -> Tags {
    raw.into_iter()
        .filter_map(|(k, v)| {
            let v = first_value(&v);
            if v.is_empty() {
                None
            } else {
                Some((k, v.to_string()))
            }
        })
        .collect()
}

/// One tagged OSM element with WGS84 geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: i64,
    pub geometry: Geometry<f64>,
    #[serde(default)]
    pub tags: Tags,
}

impl Feature {
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn is_polygonal(&self) -> bool {
        matches!(
            self.geometry,
            Geometry::Polygon(_) | Geometry::MultiPolygon(_)
        )
    }

    pub fn is_linear(&self) -> bool {
        matches!(
            self.geometry,
            Geometry::LineString(_) | Geometry::MultiLineString(_)
        )
    }
}

/// A named layer: every feature matched by one tag query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    pub layer: String,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(layer: impl Into<String>, features: Vec<Feature>) -> Self {
        Self {
            layer: layer.into(),
            features,
        }
    }

    pub fn empty(layer: impl Into<String>) -> Self {
        Self::new(layer, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }
}

/// One drivable/walkable way of the street network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreetEdge {
    pub way_id: i64,
    /// Normalized `highway` value; `None` when the way carries none.
    pub highway: Option<String>,
    pub geometry: LineString<f64>,
}

/// The mandatory base layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreetNetwork {
    pub edges: Vec<StreetEdge>,
}

impl StreetNetwork {
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_value_of_list_tag() {
        assert_eq!(first_value("primary;secondary"), "primary");
        assert_eq!(first_value(" residential "), "residential");
        assert_eq!(first_value(""), "");
    }

    #[test]
    fn test_normalize_drops_empty() {
        let mut raw = HashMap::new();
        raw.insert("highway".to_string(), "trunk;primary".to_string());
        raw.insert("name".to_string(), " ".to_string());
        let tags = normalize_tags(raw);
        assert_eq!(tags.get("highway").map(String::as_str), Some("trunk"));
        assert!(!tags.contains_key("name"));
    }
}
