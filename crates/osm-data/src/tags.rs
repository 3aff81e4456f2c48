//! Tag queries and the named poster layers.
//!
//! A query is a union of filters: a feature matches when any filter
//! matches. A filter either accepts any value of a key or one of a fixed
//! list of values.

use crate::model::Tags;

#[derive(Debug, Clone, PartialEq)]
pub enum TagMatch {
    Any,
    OneOf(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TagFilter {
    pub key: String,
    pub matcher: TagMatch,
}

impl TagFilter {
    pub fn any(key: &str) -> Self {
        Self {
            key: key.to_string(),
            matcher: TagMatch::Any,
        }
    }

    pub fn one_of(key: &str, values: &[&str]) -> Self {
        Self {
            key: key.to_string(),
            matcher: TagMatch::OneOf(values.iter().map(|v| v.to_string()).collect()),
        }
    }

    /// Stable text form: `key` or `key=v1,v2` with sorted values.
    pub fn canonical(&self) -> String {
        match &self.matcher {
            TagMatch::Any => self.key.clone(),
            TagMatch::OneOf(values) => {
                let mut values = values.clone();
                values.sort();
                values.dedup();
                format!("{}={}", self.key, values.join(","))
            }
        }
    }

    /// Overpass QL tag selector.
    pub fn selector(&self) -> String {
        let key = escape(&self.key);
        match &self.matcher {
            TagMatch::Any => format!("[\"{}\"]", key),
            TagMatch::OneOf(values) if values.len() == 1 => {
                format!("[\"{}\"=\"{}\"]", key, escape(&values[0]))
            }
            TagMatch::OneOf(values) => {
                let alternatives: Vec<String> = values.iter().map(|v| escape_regex(v)).collect();
                format!("[\"{}\"~\"^({})$\"]", key, alternatives.join("|"))
            }
        }
    }

    pub fn matches(&self, tags: &Tags) -> bool {
        match (tags.get(&self.key), &self.matcher) {
            (None, _) => false,
            (Some(_), TagMatch::Any) => true,
            (Some(value), TagMatch::OneOf(values)) => values.iter().any(|v| v == value),
        }
    }
}

/// Union of tag filters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagQuery {
    pub filters: Vec<TagFilter>,
}

impl TagQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn any(mut self, key: &str) -> Self {
        self.filters.push(TagFilter::any(key));
        self
    }

    pub fn one_of(mut self, key: &str, values: &[&str]) -> Self {
        self.filters.push(TagFilter::one_of(key, values));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Canonical filter strings, sorted, for cache keys.
    pub fn canonical_filters(&self) -> Vec<String> {
        let mut out: Vec<String> = self.filters.iter().map(TagFilter::canonical).collect();
        out.sort();
        out
    }

    pub fn matches(&self, tags: &Tags) -> bool {
        self.filters.iter().any(|f| f.matches(tags))
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn escape_regex(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if "\\^$.|?*+()[]{}".contains(c) {
            out.push_str("\\\\");
        }
        if c == '"' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

// ============================================================================
// Poster layers
// ============================================================================

/// Every optional vector layer a poster draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    AdminBoundaries,
    Landuse,
    Water,
    Parks,
    Railways,
    Buildings,
    Coastline,
    Maritime,
}

impl LayerKind {
    /// Fetch order.
    pub fn all() -> &'static [LayerKind] {
        &[
            LayerKind::AdminBoundaries,
            LayerKind::Landuse,
            LayerKind::Water,
            LayerKind::Parks,
            LayerKind::Railways,
            LayerKind::Buildings,
            LayerKind::Coastline,
            LayerKind::Maritime,
        ]
    }

    /// Layer name used in logs and cache keys.
    pub fn name(&self) -> &'static str {
        match self {
            LayerKind::AdminBoundaries => "admin_boundaries",
            LayerKind::Landuse => "landuse",
            LayerKind::Water => "water",
            LayerKind::Parks => "parks",
            LayerKind::Railways => "railways",
            LayerKind::Buildings => "buildings",
            LayerKind::Coastline => "coastline",
            LayerKind::Maritime => "maritime",
        }
    }

    pub fn query(&self) -> TagQuery {
        match self {
            LayerKind::AdminBoundaries => TagQuery::new()
                .one_of("boundary", &["administrative"])
                .one_of("admin_level", &["4", "5", "6", "7", "8", "9", "10"]),
            LayerKind::Landuse => TagQuery::new()
                .any("landuse")
                .one_of(
                    "natural",
                    &[
                        "scrub", "grassland", "wood", "heath", "sand", "beach", "bare_rock",
                        "scree", "shingle", "fell",
                    ],
                )
                .one_of("place", &["island"])
                .any("leisure"),
            LayerKind::Water => TagQuery::new()
                .one_of("natural", &["water"])
                .one_of("waterway", &["riverbank"])
                .one_of("water", &["lake", "river", "pond", "reservoir", "lagoon", "canal"]),
            LayerKind::Parks => TagQuery::new()
                .one_of("leisure", &["park"])
                .one_of("landuse", &["grass"]),
            LayerKind::Railways => TagQuery::new().one_of(
                "railway",
                &["rail", "subway", "light_rail", "tram", "narrow_gauge"],
            ),
            LayerKind::Buildings => TagQuery::new().any("building"),
            LayerKind::Coastline => TagQuery::new().one_of("natural", &["coastline"]),
            LayerKind::Maritime => TagQuery::new().one_of("boundary", &["maritime"]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_canonical_sorts_values() {
        let filter = TagFilter::one_of("water", &["river", "lake", "lake"]);
        assert_eq!(filter.canonical(), "water=lake,river");
        assert_eq!(TagFilter::any("building").canonical(), "building");
    }

    #[test]
    fn test_selectors() {
        assert_eq!(TagFilter::any("building").selector(), r#"["building"]"#);
        assert_eq!(
            TagFilter::one_of("natural", &["water"]).selector(),
            r#"["natural"="water"]"#
        );
        assert_eq!(
            TagFilter::one_of("railway", &["rail", "tram"]).selector(),
            r#"["railway"~"^(rail|tram)$"]"#
        );
    }

    #[test]
    fn test_query_is_a_union() {
        let query = LayerKind::Parks.query();
        assert!(query.matches(&tags(&[("leisure", "park")])));
        assert!(query.matches(&tags(&[("landuse", "grass")])));
        assert!(!query.matches(&tags(&[("leisure", "pitch")])));
        assert!(!query.matches(&tags(&[("amenity", "bench")])));
    }

    #[test]
    fn test_layer_names_are_unique() {
        let mut names: Vec<&str> = LayerKind::all().iter().map(LayerKind::name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), LayerKind::all().len());
    }

    #[test]
    fn test_canonical_filters_sorted() {
        let filters = LayerKind::Water.query().canonical_filters();
        assert_eq!(
            filters,
            vec![
                "natural=water".to_string(),
                "water=canal,lagoon,lake,pond,reservoir,river".to_string(),
                "waterway=riverbank".to_string(),
            ]
        );
    }
}
