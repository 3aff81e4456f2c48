//! Multipolygon ring assembly.
//!
//! Relation members arrive as separate way geometries that share end nodes.
//! Ways are chained end to end (reversing where needed) into closed rings;
//! chains that never close are dropped. Inner rings are attached to the
//! first outer ring that contains them.

use geo::Contains;
use geo_types::{Coord, LineString, MultiPolygon, Point, Polygon};

/// Join way segments into closed rings.
pub fn assemble_rings(segments: Vec<Vec<Coord<f64>>>) -> Vec<LineString<f64>> {
    let mut rings = Vec::new();
    let mut open: Vec<Vec<Coord<f64>>> = Vec::new();

    for segment in segments {
        if segment.len() < 2 {
            continue;
        }
        if is_closed(&segment) {
            if segment.len() >= 4 {
                rings.push(LineString::from(segment));
            }
        } else {
            open.push(segment);
        }
    }

    while let Some(mut chain) = open.pop() {
        loop {
            if is_closed(&chain) {
                break;
            }
            let Some(end) = chain.last().copied() else {
                break;
            };
            let next = open
                .iter()
                .position(|s| s.first() == Some(&end) || s.last() == Some(&end));
            let Some(index) = next else {
                break;
            };
            let mut segment = open.swap_remove(index);
            if segment.first() != Some(&end) {
                segment.reverse();
            }
            chain.extend(segment.into_iter().skip(1));
        }

        if is_closed(&chain) && chain.len() >= 4 {
            rings.push(LineString::from(chain));
        }
    }

    rings
}

/// Build a multipolygon from outer and inner member segments.
pub fn build_multipolygon(
    outers: Vec<Vec<Coord<f64>>>,
    inners: Vec<Vec<Coord<f64>>>,
) -> Option<MultiPolygon<f64>> {
    let outer_rings = assemble_rings(outers);
    if outer_rings.is_empty() {
        return None;
    }

    let mut polygons: Vec<(LineString<f64>, Vec<LineString<f64>>)> =
        outer_rings.into_iter().map(|r| (r, Vec::new())).collect();

    for inner in assemble_rings(inners) {
        let Some(probe) = inner.0.first().copied() else {
            continue;
        };
        let owner = polygons.iter_mut().find(|(outer, _)| {
            Polygon::new(outer.clone(), Vec::new()).contains(&Point::from(probe))
        });
        if let Some((_, holes)) = owner {
            holes.push(inner);
        }
    }

    Some(MultiPolygon::new(
        polygons
            .into_iter()
            .map(|(exterior, holes)| Polygon::new(exterior, holes))
            .collect(),
    ))
}

fn is_closed(coords: &[Coord<f64>]) -> bool {
    coords.len() >= 2 && coords.first() == coords.last()
}
