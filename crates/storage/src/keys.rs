//! Cache key construction.
//!
//! A key must name every parameter that affects the cached value, and the
//! same logical request must always produce the same key.

use std::fmt;

use poster_common::LatLon;

/// Semantic cache key; `Display` yields the storage key.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheKey {
    /// `coords_{city}_{country}`, case-folded, with `%` and `_` in the names
    /// escaped so the separator stays unambiguous.
    Coordinates { city: String, country: String },
    /// `graph_{lat}_{lon}_{dist}`
    Graph { center: LatLon, dist: f64 },
    /// `{layer}_{lat}_{lon}_{dist}_{filters}`, filters sorted and joined by `+`.
    Features {
        layer: String,
        center: LatLon,
        dist: f64,
        filters: Vec<String>,
    },
}

impl CacheKey {
    pub fn coordinates(city: &str, country: &str) -> Self {
        CacheKey::Coordinates {
            city: city.trim().to_lowercase(),
            country: country.trim().to_lowercase(),
        }
    }

    pub fn graph(center: LatLon, dist: f64) -> Self {
        CacheKey::Graph { center, dist }
    }

    /// Feature layer key. `filters` are the canonical tag filter strings of
    /// the query, in any order.
    pub fn features<I, S>(layer: &str, center: LatLon, dist: f64, filters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut filters: Vec<String> = filters.into_iter().map(Into::into).collect();
        filters.sort();
        filters.dedup();
        CacheKey::Features {
            layer: layer.to_string(),
            center,
            dist,
            filters,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Coordinates { city, country } => write!(
                f,
                "coords_{}_{}",
                escape_component(city),
                escape_component(country)
            ),
            CacheKey::Graph { center, dist } => {
                write!(f, "graph_{}_{}_{}", center.lat, center.lon, dist)
            }
            CacheKey::Features {
                layer,
                center,
                dist,
                filters,
            } => write!(
                f,
                "{}_{}_{}_{}_{}",
                layer,
                center.lat,
                center.lon,
                dist,
                filters.join("+")
            ),
        }
    }
}

fn escape_component(s: &str) -> String {
    s.replace('%', "%25").replace('_', "%5F")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_case_folded() {
        assert_eq!(
            CacheKey::coordinates("Lauris", "FRANCE").to_string(),
            "coords_lauris_france"
        );
        assert_eq!(
            CacheKey::coordinates("lauris", "france"),
            CacheKey::coordinates("LAURIS", " France ")
        );
    }

    #[test]
    fn test_underscores_in_names_do_not_collide() {
        let a = CacheKey::coordinates("new_york", "us").to_string();
        let b = CacheKey::coordinates("new", "york_us").to_string();
        assert_ne!(a, b);
        assert_eq!(a, "coords_new%5Fyork_us");
        assert_ne!(
            CacheKey::coordinates("a%5F", "b").to_string(),
            CacheKey::coordinates("a_", "b").to_string()
        );
    }

    #[test]
    fn test_graph_key() {
        let key = CacheKey::graph(LatLon::new(43.7833, 5.3167), 4000.0);
        assert_eq!(key.to_string(), "graph_43.7833_5.3167_4000");
    }
}
