//! Road classes and draw order.

use poster_common::{Color, Theme};

// ============================================================================
// Draw order
// ============================================================================

/// Draw priority of every poster element; higher values render on top.
pub mod zorder {
    pub const SEA: f64 = -1.0;
    pub const LAND: f64 = -0.3;
    pub const LANDUSE: f64 = 0.0;
    pub const BUILDINGS: f64 = 0.4;
    pub const WATER: f64 = 0.5;
    pub const MARITIME: f64 = 0.6;
    pub const PARKS: f64 = 0.8;
    pub const ROADS: f64 = 2.0;
    pub const RAILWAYS: f64 = 3.5;
    pub const GRADIENT: f64 = 10.0;
    pub const TEXT: f64 = 11.0;
}

/// Railway stroke width in points.
pub const RAILWAY_WIDTH: f64 = 1.8;

// ============================================================================
// Road classes
// ============================================================================

/// Road hierarchy used for color and width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RoadClass {
    Motorway,
    Primary,
    Secondary,
    Tertiary,
    Residential,
    Other,
}

impl RoadClass {
    /// Classify a normalized `highway` value. Missing and unknown values are
    /// `Other`.
    pub fn from_highway(highway: Option<&str>) -> Self {
        match highway {
            Some("motorway" | "motorway_link") => RoadClass::Motorway,
            Some("trunk" | "trunk_link" | "primary" | "primary_link") => RoadClass::Primary,
            Some("secondary" | "secondary_link") => RoadClass::Secondary,
            Some("tertiary" | "tertiary_link") => RoadClass::Tertiary,
            Some("residential" | "living_street" | "unclassified") => RoadClass::Residential,
            _ => RoadClass::Other,
        }
    }

    /// Stroke width in points.
    pub fn width(&self) -> f64 {
        match self {
            RoadClass::Motorway => 1.2,
            RoadClass::Primary => 1.0,
            RoadClass::Secondary => 0.8,
            RoadClass::Tertiary => 0.6,
            RoadClass::Residential | RoadClass::Other => 0.4,
        }
    }

    pub fn color(&self, theme: &Theme) -> Color {
        match self {
            RoadClass::Motorway => theme.road_motorway,
            RoadClass::Primary => theme.road_primary,
            RoadClass::Secondary => theme.road_secondary,
            RoadClass::Tertiary => theme.road_tertiary,
            RoadClass::Residential => theme.road_residential,
            RoadClass::Other => theme.road_default,
        }
    }

    /// Minor classes first so major roads end up on top.
    pub fn paint_order() -> [RoadClass; 6] {
        [
            RoadClass::Other,
            RoadClass::Residential,
            RoadClass::Tertiary,
            RoadClass::Secondary,
            RoadClass::Primary,
            RoadClass::Motorway,
        ]
    }
}
